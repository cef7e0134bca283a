fn main() {
    if let Err(e) = haunted_house::run() {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
