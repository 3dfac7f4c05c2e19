fn main() {
    if let Err(err) = erd_canvas_layout::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
