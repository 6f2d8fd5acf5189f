fn main() {
    if let Err(err) = handyflow_lib::run() {
        eprintln!("handyflow: {err:#}");
        std::process::exit(1);
    }
}
