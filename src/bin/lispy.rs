use lispy::{cmdline, environment};

fn main() -> Result<(), cmdline::Error> {
    pretty_env_logger::init();
    let prelude = environment::Prelude::new();
    let args = std::env::args().collect();
    cmdline::launch(args, &prelude)
}
