use tracing::error;

fn main() {
    if let Err(e) = lib_platform::init() {
        error!("❌ Application error: {:?}", e);
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}
