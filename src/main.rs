#[macro_use]
extern crate log;

use clap::{App, Arg};
use flowshop::data::{JobId, Variant};
use flowshop::parser::parse_instance;
use flowshop::session::{Config, Session};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha;
use std::error::Error;
use std::fs;

fn main() {
  env_logger::init();

  let matches = App::new("flowshop")
    .version("1.0")
    .about("Evaluates and edits a permutation schedule of a flow shop")
    .arg(
      Arg::with_name("instance")
        .long("instance")
        .help("Instance file name")
        .takes_value(true)
        .required(true),
    )
    .arg(
      Arg::with_name("variant")
        .long("variant")
        .help("Timing semantics")
        .possible_values(&Variant::NAMES)
        .default_value("synchronous")
        .takes_value(true),
    )
    .arg(
      Arg::with_name("weighted")
        .long("weighted")
        .help("Use job weights in the weighted objectives"),
    )
    .arg(
      Arg::with_name("permutation")
        .long("permutation")
        .help("Comma separated job order, 1-based")
        .takes_value(true)
        .conflicts_with("seed"),
    )
    .arg(
      Arg::with_name("seed")
        .long("seed")
        .help("Seed for a random initial order")
        .takes_value(true),
    )
    .arg(
      Arg::with_name("edit")
        .long("edit")
        .help("Edit to apply: swap:A:B, shift:JOB:TARGET, unlink:JOB, undo or redo")
        .takes_value(true)
        .multiple(true)
        .number_of_values(1),
    )
    .get_matches();

  let file = matches.value_of("instance").expect("Missing instance file");
  let variant: Variant = matches
    .value_of("variant")
    .and_then(|v| v.parse().ok())
    .expect("Invalid variant");
  let config = Config {
    variant: variant,
    weighted: matches.is_present("weighted"),
  };

  let contents = fs::read_to_string(file).expect("Error reading file");
  let instance = parse_instance(&contents).expect("Error parsing file");
  let n_jobs = instance.n_jobs();

  let order: Vec<JobId> = if let Some(permutation) = matches.value_of("permutation") {
    parse_permutation(permutation).expect("Invalid permutation")
  } else if let Some(seed) = matches.value_of("seed") {
    let seed: u64 = seed.parse().expect("Invalid seed");
    let mut rng = rand_chacha::ChaChaRng::seed_from_u64(seed);
    let mut order: Vec<JobId> = (0..n_jobs).collect();
    order.shuffle(&mut rng);
    order
  } else {
    (0..n_jobs).collect()
  };

  let mut session =
    Session::with_permutation(instance, &order, config).expect("Invalid permutation");

  for edit in matches.values_of("edit").into_iter().flatten() {
    apply_edit(&mut session, edit).expect("Edit failed");
  }

  session.sequence().verify().expect("Verification failed");
  print_session(&mut session).expect("Evaluation failed");
}

fn parse_permutation(text: &str) -> Result<Vec<JobId>, Box<dyn Error>> {
  let mut order = Vec::new();
  for item in text.split(',') {
    let number: usize = item.trim().parse()?;
    order.push(number.checked_sub(1).ok_or("Job numbers start at 1")?);
  }
  Ok(order)
}

fn apply_edit(session: &mut Session, edit: &str) -> Result<(), Box<dyn Error>> {
  let items: Vec<&str> = edit.split(':').collect();
  let job = |i: usize| -> Result<JobId, Box<dyn Error>> {
    let number: usize = items.get(i).ok_or("Job missing")?.parse()?;
    Ok(number.checked_sub(1).ok_or("Job numbers start at 1")?)
  };

  match items[0] {
    "swap" => session.swap(job(1)?, job(2)?)?,
    "shift" => session.shift(job(1)?, job(2)?)?,
    "unlink" => session.unlink(job(1)?)?,
    "undo" => {
      if !session.undo()? {
        warn!("Nothing to undo");
      }
    }
    "redo" => {
      if !session.redo()? {
        warn!("Nothing to redo");
      }
    }
    other => Err(format!("Unknown edit {:?}", other))?,
  }

  debug!("Applied {}", edit);
  Ok(())
}

fn print_session(session: &mut Session) -> Result<(), Box<dyn Error>> {
  let objectives = session.objectives()?;
  println!("{}", objectives);

  let order = session.sequence().order();
  let schedule = session.schedule();
  for job in order {
    let offsets = schedule.offsets().row(job).iter().join(" ");
    let end = schedule.end_times()[job];
    println!("{}: {} | {}", job + 1, offsets, end);
  }
  Ok(())
}
