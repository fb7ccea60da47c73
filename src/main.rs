fn main() {
    if let Err(error) = macrowhisper::run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
