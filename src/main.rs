fn main() {
    lucid::cli::run();
}
