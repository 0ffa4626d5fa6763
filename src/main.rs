fn main() {
    csvault::logging::init();
    let args: Vec<String> = std::env::args().collect();
    std::process::exit(csvault::cli::run_with_args(&args));
}
