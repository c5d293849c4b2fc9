//! Test Master CLI entry point

fn main() {
    testmaster::cli::run();
}
