fn main() {
    if let Err(err) = entityflow::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
