//! Loading textures and models from the asset root.
//!
//! Natively assets are read with `tokio::fs` from a directory (by default
//! `./assets`), on the web they are fetched relative to `<origin>/<root>/`.
//! Asset paths are written as in the scene description (`/textures/...`);
//! the leading slash is relative to the asset root, not the file system root.

use anyhow::Context;

pub mod gltf;
pub mod texture;

#[derive(Clone, Debug, PartialEq)]
pub struct Assets {
    root: String,
}

impl Assets {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Location of `path` below the asset root.
    pub fn resolve(&self, path: &str) -> String {
        let root = self.root.trim_end_matches('/');
        let path = normalize(path.trim_start_matches('/'));
        if root.is_empty() {
            path
        } else {
            format!("{root}/{path}")
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn url(&self, path: &str) -> anyhow::Result<reqwest::Url> {
        let window = web_sys::window().context("no window to resolve assets against")?;
        let origin = window
            .location()
            .origin()
            .map_err(|e| anyhow::anyhow!("could not read the page origin: {e:?}"))?;
        let base = reqwest::Url::parse(&format!("{origin}/"))?;
        Ok(base.join(&self.resolve(path))?)
    }

    pub async fn load_binary(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        #[cfg(target_arch = "wasm32")]
        let data = {
            let url = self.url(path)?;
            let response = reqwest::get(url.clone())
                .await
                .with_context(|| format!("could not fetch {url}"))?
                .error_for_status()?;
            response.bytes().await?.to_vec()
        };
        #[cfg(not(target_arch = "wasm32"))]
        let data = {
            let location = self.resolve(path);
            tokio::fs::read(&location)
                .await
                .with_context(|| format!("could not read {location}"))?
        };

        Ok(data)
    }
}

/// Lower-case file extension, used as a decoder hint.
pub fn extension(path: &str) -> Option<String> {
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// `uri` relative to the directory of `base`, as glTF references resolve.
pub fn sibling(base: &str, uri: &str) -> String {
    let uri = percent_encoding::percent_decode_str(uri).decode_utf8_lossy();
    match base.rfind('/') {
        Some(idx) => normalize(&format!("{}/{}", &base[..idx], uri)),
        None => normalize(&uri),
    }
}

fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_slash_is_relative_to_the_root() {
        let assets = Assets::new("assets/");
        assert_eq!(
            assets.resolve("/textures/door/color.jpg"),
            "assets/textures/door/color.jpg"
        );
        assert_eq!(Assets::new("").resolve("/models/bmw/scene.gltf"), "models/bmw/scene.gltf");
    }

    #[test]
    fn gltf_uris_resolve_next_to_the_model() {
        assert_eq!(
            sibling("models/bmw/scene.gltf", "scene.bin"),
            "models/bmw/scene.bin"
        );
        assert_eq!(
            sibling("models/bmw/scene.gltf", "../shared/paint%20metal.png"),
            "models/shared/paint metal.png"
        );
        assert_eq!(sibling("scene.gltf", "./a.bin"), "a.bin");
    }

    #[test]
    fn extensions_are_lower_case() {
        assert_eq!(extension("textures/roof/normal.EXR").as_deref(), Some("exr"));
        assert_eq!(extension("textures/.hidden"), None);
        assert_eq!(extension("textures/door/alpha"), None);
    }
}
