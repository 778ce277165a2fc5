use astpack::cli;

fn main() {
    cli::run();
}
