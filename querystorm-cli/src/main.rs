use std::path::PathBuf;

use env_logger::Env;
use log::{error, info, warn};
use querystorm::{
    update_generator, Error, GeneratorOptions, MockClient, QueryOracle, SqlClient,
    StatementGenerator,
};
use querystorm_types::RandomGenerator;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "querystorm",
    about = "Grammar-directed random query generator and differential testing harness for columnar SQL engines."
)]
struct Opt {
    /// PRNG seed; a fixed seed replays the same statement stream
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// Number of statements to generate
    #[structopt(short("n"), long, default_value = "1000")]
    iterations: u64,
    /// Run an oracle round every N statements
    #[structopt(long, default_value = "50")]
    oracle_period: u64,
    /// Directory the server writes query.data and table.data into
    #[structopt(long, parse(from_os_str))]
    db_file_path: Option<PathBuf>,
    /// Print every generated statement to stdout
    #[structopt(long)]
    print_statements: bool,
    /// Maximum recursion depth for types and expressions
    #[structopt(long, default_value = "3")]
    max_depth: u32,
    /// Maximum width of composite types and column lists
    #[structopt(long, default_value = "5")]
    max_width: u32,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();

    let options = GeneratorOptions::new()
        .with_seed(opt.seed)
        .with_max_depth(opt.max_depth)
        .with_max_width(opt.max_width)
        .with_db_file_path(opt.db_file_path.unwrap_or_else(std::env::temp_dir));

    let mut rg = RandomGenerator::new(*options.seed());
    let mut oracle = QueryOracle::new(options.db_file_path().clone());
    let mut gen = StatementGenerator::new(options);
    // A wire client would go here; the bundled client accepts everything and
    // fabricates output files, which is enough for offline stream replay.
    let mut client = MockClient::new();

    info!("starting run: seed {}, {} iterations", opt.seed, opt.iterations);
    let mut accepted = 0u64;
    for iteration in 1..=opt.iterations {
        let stmt = gen.generate_next_statement(&mut rg);
        let sql = stmt.to_string();
        if opt.print_statements {
            println!("{sql};");
        }
        match client.execute(&sql) {
            Ok(success) => {
                accepted += u64::from(success);
                update_generator(&mut gen.catalog, &stmt, success);
            }
            Err(err) => {
                error!("client failure: {err}");
                update_generator(&mut gen.catalog, &stmt, false);
            }
        }

        if iteration % opt.oracle_period == 0 {
            if let Err(err) = run_oracle_round(&mut rg, &mut gen, &mut oracle, &mut client) {
                match err {
                    Error::OracleMismatch { .. } => {
                        error!("{err}");
                        std::process::exit(1);
                    }
                    other => warn!("oracle round skipped: {other}"),
                }
            }
        }
    }
    info!(
        "finished: {accepted}/{} statements accepted, catalog holds {} tables, {} views",
        opt.iterations,
        gen.catalog.tables.len(),
        gen.catalog.views.len()
    );
}

fn run_oracle_round(
    rg: &mut RandomGenerator,
    gen: &mut StatementGenerator,
    oracle: &mut QueryOracle,
    client: &mut MockClient,
) -> Result<(), Error> {
    match rg.uniform(1, 3) {
        1 if !gen.catalog.attached_tables().is_empty() => {
            oracle.correctness_oracle(rg, gen, client)
        }
        2 => {
            let candidates = gen.catalog.attached_tables_for_oracle();
            if candidates.is_empty() {
                return Ok(());
            }
            let id = *rg.pick(&candidates);
            let t = gen.catalog.tables[&id].clone();
            oracle.dump_reload_oracle(rg, &t, client)
        }
        _ => oracle.settings_oracle(rg, gen, client),
    }
}
