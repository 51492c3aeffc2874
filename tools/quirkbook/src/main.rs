fn main() {
    match quirkbook::run() {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(quirkbook::verdict::EXIT_FAULT);
        }
    }
}
