use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use waypoint_partitioner::coords::{parse_latitude, parse_longitude};
use waypoint_partitioner::{
    append, init_logging, lookup, merge, normalizer, partitioner, regions, sorter, DataPaths,
    Error, Verbosity, DEFAULT_ROOT,
};

fn shard_arg() -> Arg {
    Arg::new("shard")
        .required(true)
        .help("Shard letter (e.g. A) or path to a shard file")
}

fn cli() -> Command {
    Command::new("waypoints")
        .version("1.0")
        .author("Jesper Fjellin")
        .about("Partitions and maintains the GeoJSON waypoint dataset")
        .subcommand_required(true)
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .default_value(DEFAULT_ROOT)
                .help("Data directory holding Waypoints.json and waypoints/"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Show debug output"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only show errors"),
        )
        .subcommand(
            Command::new("split")
                .about("Split Waypoints.json into one shard per leading character"),
        )
        .subcommand(
            Command::new("sort")
                .about("Sort a shard by waypoint id")
                .arg(shard_arg()),
        )
        .subcommand(
            Command::new("normalize")
                .about("Round a shard's coordinates to four decimal places")
                .arg(shard_arg()),
        )
        .subcommand(
            Command::new("merge").about("Rebuild Waypoints.json from the shard index"),
        )
        .subcommand(
            Command::new("regions").about("Split Waypoints.json into regional files"),
        )
        .subcommand(
            Command::new("add")
                .about("Add waypoints from a CSV of id,name1,lat,lon (DMS) to a shard")
                .arg(shard_arg())
                .arg(Arg::new("csv").required(true).help("CSV file of new waypoints")),
        )
        .subcommand(
            Command::new("check")
                .about("Show the details of one waypoint")
                .arg(Arg::new("id").required(true).help("Waypoint id")),
        )
        .subcommand(
            Command::new("dms")
                .about("Convert ddmmssN / dddmmssE values to decimal degrees")
                .arg(Arg::new("values").num_args(1..).required(true)),
        )
}

// A single character selects the conventional shard; anything else is a path.
fn shard_path(paths: &DataPaths, value: &str) -> PathBuf {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => paths.shard(letter),
        _ => PathBuf::from(value),
    }
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let paths = DataPaths::new(value(matches, "root"));

    match matches.subcommand() {
        Some(("split", _)) => {
            let summary = partitioner::partition_by_letter(&paths.source(), &paths.shard_dir())?;
            println!(
                "Split waypoint data into {} files ({})",
                summary.groups.len(),
                summary.index_path.display()
            );
        }
        Some(("sort", sub)) => {
            let shard = shard_path(&paths, value(sub, "shard"));
            let report = sorter::sort_shard(&shard)?;
            println!("Sorted {} waypoints by id", report.count);
            if report.changed {
                println!("Order changed");
            } else {
                println!("Order was already sorted");
            }
        }
        Some(("normalize", sub)) => {
            let shard = shard_path(&paths, value(sub, "shard"));
            let report = normalizer::normalize_shard(&shard)?;
            println!(
                "Normalized {} of {} coordinates",
                report.changes.len(),
                report.total
            );
        }
        Some(("merge", _)) => {
            let report = merge::merge_shards(&paths.index(), &paths.source())?;
            println!(
                "Merged {} waypoints from {} files",
                report.total_features,
                report.sources.len()
            );
        }
        Some(("regions", _)) => {
            let counts = regions::partition_by_region(&paths.source(), &paths.shard_dir())?;
            for count in &counts {
                println!("{}: {}", count.id, count.count);
            }
        }
        Some(("add", sub)) => {
            let shard = shard_path(&paths, value(sub, "shard"));
            let table = PathBuf::from(value(sub, "csv"));
            let report = append::append_waypoints(&shard, &table)?;
            println!(
                "Added {} waypoints ({} skipped), {} in total",
                report.added.len(),
                report.skipped.len(),
                report.total
            );
        }
        Some(("check", sub)) => {
            let id = value(sub, "id");
            match lookup::find_waypoint(&paths.shard_dir(), id)? {
                Some(waypoint) => {
                    println!("ID: {}", waypoint.id);
                    println!("Name: {}", waypoint.name1.as_deref().unwrap_or("-"));
                    println!("Type: {}", waypoint.kind.as_deref().unwrap_or("-"));
                    println!("Coordinates: [lon {}, lat {}]", waypoint.lon, waypoint.lat);
                    println!("DMS: {}", waypoint.dms());
                }
                None => println!("Waypoint {} not found", id),
            }
        }
        Some(("dms", sub)) => {
            for value in sub.get_many::<String>("values").into_iter().flatten() {
                let upper = value.trim().to_ascii_uppercase();
                let degrees = if upper.ends_with('N') || upper.ends_with('S') {
                    parse_latitude(value)?
                } else {
                    parse_longitude(value)?
                };
                println!("{} -> {}", value, degrees);
            }
        }
        _ => unreachable!("subcommand_required is set"),
    }
    Ok(())
}

fn main() {
    let matches = cli().get_matches();

    init_logging(Verbosity::from_flags(
        matches.get_flag("quiet"),
        matches.get_flag("verbose"),
    ));

    if let Err(e) = run(&matches) {
        eprintln!("Error: {}", e);
        if e.is_data_error() {
            eprintln!("No files were written.");
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_shard_argument() {
        let paths = DataPaths::new("data");
        assert_eq!(
            shard_path(&paths, "O"),
            PathBuf::from("data/waypoints/waypoints_O.json")
        );
        assert_eq!(shard_path(&paths, "x/y.json"), PathBuf::from("x/y.json"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["waypoints", "sort", "A", "-q", "--root", "data"])
            .unwrap();
        assert!(matches.get_flag("quiet"));
        assert_eq!(matches.get_one::<String>("root").unwrap(), "data");
    }
}
