fn main() {
    if let Err(err) = inset_layout::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
