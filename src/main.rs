use std::io;

fn main() -> io::Result<()> {
    functrace::cli::main()
}
