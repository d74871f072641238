use crate::data::{is_processing_time, Instance, JobId, JobRecord, Time};
use crate::error::{Error, Result};
use log;
use std::str::FromStr;

// Lines that carry content, numbered from 1; blank lines and `#` comments are skipped.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
  text
    .lines()
    .enumerate()
    .map(|(i, line)| (i + 1, line.trim()))
    .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn parse_token<T: FromStr>(token: &str, line: usize) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  return token.parse().map_err(|e: T::Err| Error::Parse {
    line: line,
    message: format!("{:?}: {}", token, e),
  });
}

fn parse_time(token: &str, line: usize) -> Result<Time> {
  let time = parse_token::<Time>(token, line)?;
  if !is_processing_time(time) {
    return Err(Error::Parse {
      line: line,
      message: format!("{:?} is not a processing time", token),
    });
  }
  Ok(time)
}

/// Parses an instance:
///
/// ```text
/// # machines jobs
/// 2 3
/// 3 2
/// 1 4
/// 2 2
/// # optional: job due-date [weight], for all jobs or none
/// 1 5
/// 2 9 2
/// 3 7
/// ```
///
/// A due-date section that is incomplete or malformed leaves every job
/// without due date and with weight 1.
pub fn parse_instance(text: &str) -> Result<Instance> {
  let mut lines = content_lines(text);

  let (line, prelude) = lines.next().ok_or(Error::Parse {
    line: 0,
    message: "prelude missing".to_string(),
  })?;
  let prelude_items: Vec<&str> = prelude.split_whitespace().collect();
  if prelude_items.len() != 2 {
    return Err(Error::Parse {
      line: line,
      message: format!("expected \"machines jobs\" but found {:?}", prelude),
    });
  }
  let n_machines: usize = parse_token(prelude_items[0], line)?;
  let n_jobs: usize = parse_token(prelude_items[1], line)?;

  let mut jobs = Vec::with_capacity(n_jobs);
  let mut last_line = line;
  for id in 0..n_jobs {
    let (line, content) = lines.next().ok_or(Error::Parse {
      line: last_line,
      message: format!("{} jobs are required but only {} found", n_jobs, id),
    })?;
    last_line = line;

    let items: Vec<&str> = content.split_whitespace().collect();
    if items.len() != n_machines {
      return Err(Error::Parse {
        line: line,
        message: format!(
          "{} processing times instead of {}",
          items.len(),
          n_machines
        ),
      });
    }
    let times = items
      .iter()
      .map(|item| parse_time(item, line))
      .collect::<Result<Vec<_>>>()?;
    jobs.push(JobRecord::new(id, times));
  }

  let due_dates = parse_due_dates(&mut lines, n_jobs);
  if due_dates.len() == n_jobs {
    for (id, due_date, weight) in due_dates {
      jobs[id].set_due_date(Some(due_date));
      if let Some(weight) = weight {
        jobs[id].set_weight(weight);
      }
    }
  } else if !due_dates.is_empty() {
    log::warn!(
      "Ignoring due dates: {} of {} jobs carry one",
      due_dates.len(),
      n_jobs
    );
  }

  return Instance::new(n_machines, jobs);
}

// Reads due-date lines until the first one that does not fit.
fn parse_due_dates<'a, I>(lines: &mut I, n_jobs: usize) -> Vec<(JobId, Time, Option<Time>)>
where
  I: Iterator<Item = (usize, &'a str)>,
{
  let mut due_dates = Vec::new();
  for (line, content) in lines.take(n_jobs) {
    let items: Vec<&str> = content.split_whitespace().collect();
    if items.len() < 2 || items.len() > 3 {
      break;
    }

    let id = match items[0].parse::<usize>() {
      Ok(id) if id >= 1 && id <= n_jobs => id - 1,
      _ => {
        log::warn!("line {}: invalid job id {:?}", line, items[0]);
        break;
      }
    };
    let due_date = match items[1].parse::<Time>() {
      Ok(d) if d.is_finite() => d,
      _ => {
        log::warn!("line {}: invalid due date {:?}", line, items[1]);
        break;
      }
    };
    let weight = match items.get(2).map(|w| w.parse::<Time>()) {
      Some(Ok(w)) if w.is_finite() && w >= 0.0 => Some(w),
      Some(_) => {
        log::warn!("line {}: invalid weight {:?}", line, items[2]);
        break;
      }
      None => None,
    };

    due_dates.push((id, due_date, weight));
  }

  return due_dates;
}
