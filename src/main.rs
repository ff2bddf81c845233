fn main() {
    if let Err(err) = org_graph_engine::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
