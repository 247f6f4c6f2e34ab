use clap::{Parser, Subcommand};
use mutaties::logging::{LevelFilter, Logger};
use mutaties::queue::Queue;

mod logging;
mod migrate;
mod queue;
mod websim;
mod worker;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, help = "Log debug messages too", default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    subcommands: Subcommands,
}

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Create the queue tables.
    Migrate,

    /// Process mutations for a while, then exit.
    Worker {
        /// Queue to process: competitie, bestel, betaal or scheids.
        queue: Queue,

        /// Minutes to run: 1, 2, 5, 7, 10, 15, 20, 30, 45 or 60.
        duration: u32,

        #[arg(long, help = "Stop at this minute of the hour")]
        stop_exactly: Option<u8>,

        #[arg(long, help = "Count the duration in seconds", default_value = "false")]
        quick: bool,
    },

    /// Write a mutation and ping the worker.
    Submit {
        queue: Queue,

        #[arg(long, help = "Mutation code")]
        code: i32,

        #[arg(long, help = "JSON reference to the entity", default_value = "{}")]
        payload: String,

        #[arg(long, help = "Who asked for it", default_value = "")]
        door: String,

        #[arg(long, help = "Don't wait for the worker", default_value = "false")]
        fast: bool,

        #[arg(
            long,
            help = "Reuse an unprocessed mutation with the same code and payload",
            default_value = "false"
        )]
        reuse: bool,
    },

    /// Wake up a worker.
    Ping { queue: Queue },

    /// Show queue sizes.
    Stats { queue: Option<Queue> },

    /// Run a test-double server.
    Websim {
        #[command(subcommand)]
        command: Websim,
    },
}

#[derive(Subcommand, Debug)]
enum Websim {
    /// Mail provider.
    Mail {
        #[arg(long, help = "Listen on this port instead of the configured one")]
        port: Option<u16>,
    },

    /// Pass download API.
    Bondspas {
        #[arg(long, help = "Listen on this port instead of the configured one")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    if args.verbose {
        Logger::init_level(LevelFilter::DEBUG);
    } else {
        Logger::init();
    }

    let result = match args.subcommands {
        Subcommands::Migrate => migrate::migrate().await,
        Subcommands::Worker {
            queue,
            duration,
            stop_exactly,
            quick,
        } => worker::run(queue, duration, stop_exactly, quick).await,
        Subcommands::Submit {
            queue,
            code,
            payload,
            door,
            fast,
            reuse,
        } => queue::submit(queue, code, &payload, &door, fast, reuse).await,
        Subcommands::Ping { queue } => queue::ping(queue).await,
        Subcommands::Stats { queue } => queue::stats(queue).await,
        Subcommands::Websim { command } => match command {
            Websim::Mail { port } => websim::mail(port).await,
            Websim::Bondspas { port } => websim::bondspas(port).await,
        },
    };

    if let Err(err) = result {
        logging::error(err);
        std::process::exit(1);
    }
}
