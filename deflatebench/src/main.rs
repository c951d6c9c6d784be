fn main() {
    if let Err(e) = deflatebench_cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
