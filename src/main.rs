use std::process;

use edgecloak::cli;
use env_logger::Env;

fn main()
{
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .init();

    if let Err(err) = cli::run()
    {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
