//! Scheduling objectives over the scheduled chain.
//!
//! | Objective | Definition |
//! |-----------|------------|
//! | Cmax | Latest end time |
//! | ΣwC | Sum of weight × end time |
//! | Lmax | Largest end time − due date |
//! | ΣwT | Sum of weight × max(0, end time − due date) |
//! | ΣwL | Sum of weight × (end time − due date), not clamped |
//! | ΣwU | Sum of the weights of tardy jobs |
//!
//! Due-date objectives only cover jobs that carry a due date and are `None`
//! when no job does.

use crate::data::{JobId, Time};
use crate::error::{invalid, Result};
use crate::sequence::Sequence;
use crate::timing::Schedule;
use itertools::Itertools;
use std::fmt;

/// An objective value together with the jobs responsible for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Critical {
  pub value: Time,
  pub jobs: Vec<JobId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objectives {
  pub cmax: Time,
  pub weighted_completion: Time,
  pub lmax: Option<Critical>,
  pub weighted_tardiness: Option<Time>,
  pub weighted_lateness: Option<Time>,
  pub weighted_tardy_jobs: Option<Critical>,
}

/// Evaluates the scheduled chain of `seq`. Weights count as 1 unless `weighted`.
///
/// Fails if `schedule` was not computed for a sequence of the same shape.
pub fn evaluate(seq: &Sequence, schedule: &Schedule, weighted: bool) -> Result<Objectives> {
  if schedule.shape() != (seq.n_jobs(), seq.n_machines()) {
    return invalid(format!(
      "schedule of shape {:?} does not fit {} jobs on {} machines",
      schedule.shape(),
      seq.n_jobs(),
      seq.n_machines()
    ));
  }

  let jobs = seq.jobs();
  let ends = schedule.end_times();

  let mut cmax: Time = 0.0;
  let mut weighted_completion: Time = 0.0;
  let mut lmax: Option<Critical> = None;
  let mut weighted_tardiness: Time = 0.0;
  let mut weighted_lateness: Time = 0.0;
  let mut tardy = Critical {
    value: 0.0,
    jobs: Vec::new(),
  };
  let mut with_due_date = 0;

  for job in seq.order() {
    let end = ends[job];
    let weight = if weighted { jobs[job].weight() } else { 1.0 };

    cmax = cmax.max(end);
    weighted_completion += weight * end;

    let due_date = match jobs[job].due_date() {
      Some(d) => d,
      None => continue,
    };
    with_due_date += 1;

    let lateness = end - due_date;
    // Ties under exact equality all join the critical set.
    let is_new_max = lmax.as_ref().map_or(true, |c| lateness > c.value);
    if is_new_max {
      lmax = Some(Critical {
        value: lateness,
        jobs: vec![job],
      });
    } else if let Some(current) = lmax.as_mut() {
      if lateness == current.value {
        current.jobs.push(job);
      }
    }

    weighted_lateness += weight * lateness;
    if lateness > 0.0 {
      weighted_tardiness += weight * lateness;
      tardy.value += weight;
      tardy.jobs.push(job);
    }
  }

  let available = with_due_date > 0;
  Ok(Objectives {
    cmax: cmax,
    weighted_completion: weighted_completion,
    lmax: lmax,
    weighted_tardiness: Some(weighted_tardiness).filter(|_| available),
    weighted_lateness: Some(weighted_lateness).filter(|_| available),
    weighted_tardy_jobs: Some(tardy).filter(|_| available),
  })
}

impl fmt::Display for Objectives {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "Cmax: {}    ΣwC: {}", self.cmax, self.weighted_completion)?;
    if let Some(lmax) = &self.lmax {
      write!(
        f,
        "    Lmax: {} [{}]",
        lmax.value,
        lmax.jobs.iter().map(|j| j + 1).join(" ")
      )?;
    }
    if let Some(t) = self.weighted_tardiness {
      write!(f, "    ΣwT: {}", t)?;
    }
    if let Some(u) = &self.weighted_tardy_jobs {
      write!(
        f,
        "    ΣwU: {} [{}]",
        u.value,
        u.jobs.iter().map(|j| j + 1).join(" ")
      )?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::{Instance, JobRecord, Variant};
  use crate::error::Error;
  use crate::timing::compute;

  fn sequence(jobs: Vec<JobRecord>) -> Sequence {
    return Sequence::new(Instance::new(1, jobs).unwrap());
  }

  fn evaluate_async(seq: &Sequence, weighted: bool) -> Objectives {
    let schedule = compute(seq, Variant::Asynchronous);
    return evaluate(seq, &schedule, weighted).unwrap();
  }

  #[test]
  fn without_due_dates_only_completion_objectives() {
    let seq = sequence(vec![
      JobRecord::new(0, vec![2.0]),
      JobRecord::new(1, vec![3.0]).with_weight(4.0),
    ]);
    let objectives = evaluate_async(&seq, true);
    assert_eq!(objectives.cmax, 5.0);
    assert_eq!(objectives.weighted_completion, 2.0 + 4.0 * 5.0);
    assert_eq!(objectives.lmax, None);
    assert_eq!(objectives.weighted_tardiness, None);
    assert_eq!(objectives.weighted_lateness, None);
    assert_eq!(objectives.weighted_tardy_jobs, None);
  }

  #[test]
  fn lmax_keeps_every_tie() {
    // ends 2, 5, 6; lateness 1, 1, -4
    let seq = sequence(vec![
      JobRecord::new(0, vec![2.0]).with_due_date(1.0),
      JobRecord::new(1, vec![3.0]).with_due_date(4.0),
      JobRecord::new(2, vec![1.0]).with_due_date(10.0),
    ]);
    let lmax = evaluate_async(&seq, false).lmax.unwrap();
    assert_eq!(lmax.value, 1.0);
    assert_eq!(lmax.jobs, vec![0, 1]);
  }

  #[test]
  fn lmax_may_be_negative() {
    let seq = sequence(vec![
      JobRecord::new(0, vec![2.0]).with_due_date(5.0),
      JobRecord::new(1, vec![1.0]).with_due_date(9.0),
    ]);
    let lmax = evaluate_async(&seq, false).lmax.unwrap();
    assert_eq!(lmax.value, -3.0);
    assert_eq!(lmax.jobs, vec![0]);
  }

  #[test]
  fn tardiness_is_clamped_and_lateness_is_not() {
    // ends 2, 5; lateness -3, 2
    let seq = sequence(vec![
      JobRecord::new(0, vec![2.0]).with_due_date(5.0).with_weight(2.0),
      JobRecord::new(1, vec![3.0]).with_due_date(3.0).with_weight(3.0),
    ]);
    let objectives = evaluate_async(&seq, true);
    assert_eq!(objectives.weighted_tardiness, Some(6.0));
    assert_eq!(objectives.weighted_lateness, Some(-6.0 + 6.0));

    let tardy = objectives.weighted_tardy_jobs.unwrap();
    assert_eq!(tardy.value, 3.0);
    assert_eq!(tardy.jobs, vec![1]);
  }

  #[test]
  fn unweighted_tardy_jobs_is_a_count() {
    let seq = sequence(vec![
      JobRecord::new(0, vec![2.0]).with_due_date(1.0).with_weight(7.0),
      JobRecord::new(1, vec![3.0]).with_due_date(5.0).with_weight(7.0),
      JobRecord::new(2, vec![1.0]).with_due_date(5.0).with_weight(7.0),
    ]);
    let objectives = evaluate_async(&seq, false);
    let tardy = objectives.weighted_tardy_jobs.unwrap();
    assert_eq!(tardy.value, 2.0);
    assert_eq!(tardy.jobs, vec![0, 2]);
    assert_eq!(objectives.weighted_completion, 2.0 + 5.0 + 6.0);
  }

  #[test]
  fn on_time_exactly_is_not_tardy() {
    let seq = sequence(vec![JobRecord::new(0, vec![2.0]).with_due_date(2.0)]);
    let objectives = evaluate_async(&seq, false);
    assert_eq!(objectives.weighted_tardy_jobs.unwrap().jobs, Vec::<JobId>::new());
    assert_eq!(objectives.lmax.unwrap().value, 0.0);
  }

  #[test]
  fn detached_jobs_do_not_count() {
    let mut seq = sequence(vec![
      JobRecord::new(0, vec![2.0]),
      JobRecord::new(1, vec![9.0]).with_due_date(0.0),
      JobRecord::new(2, vec![1.0]),
    ]);
    seq.unlink(1).unwrap();
    let objectives = evaluate_async(&seq, false);
    assert_eq!(objectives.cmax, 3.0);
    assert_eq!(objectives.lmax, None);
  }

  #[test]
  fn empty_sequence_is_valid() {
    let seq = sequence(Vec::new());
    let objectives = evaluate_async(&seq, false);
    assert_eq!(objectives.cmax, 0.0);
    assert_eq!(objectives.weighted_completion, 0.0);
    assert_eq!(objectives.lmax, None);
  }

  #[test]
  fn schedule_of_another_sequence_is_rejected() {
    let small = sequence(vec![JobRecord::new(0, vec![2.0])]);
    let large = sequence(vec![
      JobRecord::new(0, vec![2.0]),
      JobRecord::new(1, vec![3.0]),
    ]);
    let schedule = compute(&small, Variant::Asynchronous);
    assert!(matches!(
      evaluate(&large, &schedule, false),
      Err(Error::InvalidArgument(_))
    ));
  }

  #[test]
  fn summary_line() {
    let seq = sequence(vec![
      JobRecord::new(0, vec![2.0]).with_due_date(1.0),
      JobRecord::new(1, vec![3.0]).with_due_date(4.0),
    ]);
    let text = evaluate_async(&seq, false).to_string();
    assert!(text.starts_with("Cmax: 5"));
    assert!(text.contains("Lmax: 1 [1 2]"));
    assert!(text.contains("ΣwU: 2 [1 2]"));
  }
}
