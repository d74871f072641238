use crate::data::{JobId, Machine, Time, Variant};
use crate::error::{invalid, Result};
use crate::sequence::Sequence;
use log;
use ndarray::{Array1, Array2};
use std::cmp;

/// Start and completion times of every job on every machine, indexed by `[job, machine]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
  variant: Variant,
  offsets: Array2<Time>,
  completions: Array2<Time>,
  end_times: Array1<Time>,
}

impl Schedule {
  pub fn variant(&self) -> Variant {
    return self.variant;
  }

  pub fn shape(&self) -> (usize, usize) {
    return self.offsets.dim();
  }

  pub fn offsets(&self) -> &Array2<Time> {
    return &self.offsets;
  }

  pub fn completions(&self) -> &Array2<Time> {
    return &self.completions;
  }

  pub fn end_times(&self) -> &Array1<Time> {
    return &self.end_times;
  }

  fn check(&self, job: JobId, machine: Machine) -> Result<()> {
    let (n_jobs, n_machines) = self.shape();
    if job >= n_jobs {
      return invalid(format!("job {} out of range 1..={}", job + 1, n_jobs));
    }
    if machine >= n_machines {
      return invalid(format!(
        "machine {} out of range 0..{}",
        machine, n_machines
      ));
    }
    Ok(())
  }

  pub fn offset(&self, job: JobId, machine: Machine) -> Result<Time> {
    self.check(job, machine)?;
    Ok(self.offsets[[job, machine]])
  }

  pub fn completion(&self, job: JobId, machine: Machine) -> Result<Time> {
    self.check(job, machine)?;
    Ok(self.completions[[job, machine]])
  }

  /// When `job` is finished with the last machine under the active variant.
  pub fn end_time(&self, job: JobId) -> Result<Time> {
    match self.end_times.get(job) {
      Some(&t) => Ok(t),
      None => invalid(format!(
        "job {} out of range 1..={}",
        job + 1,
        self.end_times.len()
      )),
    }
  }
}

/// Times every chain of `seq` under `variant`. Each chain starts at time 0.
pub fn compute(seq: &Sequence, variant: Variant) -> Schedule {
  let shape = (seq.n_jobs(), seq.n_machines());
  let mut offsets = Array2::<Time>::zeros(shape);
  let mut completions = Array2::<Time>::zeros(shape);
  let mut end_times = Array1::<Time>::zeros(seq.n_jobs());

  for chain in seq.chains() {
    let durations = chain_durations(seq, &chain);
    let (chain_offsets, chain_ends) = match variant {
      Variant::Synchronous => synchronous(&durations),
      Variant::Asynchronous => asynchronous(&durations),
      Variant::NoWait => no_wait(&durations),
      Variant::Blocking => blocking(&durations),
    };

    for (pos, &job) in chain.iter().enumerate() {
      for k in 0..seq.n_machines() {
        offsets[[job, k]] = chain_offsets[[pos, k]];
        completions[[job, k]] = chain_offsets[[pos, k]] + durations[[pos, k]];
      }
      end_times[job] = chain_ends[pos];
    }
  }

  log::debug!(
    "Computed {} schedule for {} jobs on {} machines",
    variant,
    shape.0,
    shape.1
  );

  return Schedule {
    variant: variant,
    offsets: offsets,
    completions: completions,
    end_times: end_times,
  };
}

// Processing times in chain order, indexed by `[position, machine]`.
fn chain_durations(seq: &Sequence, chain: &[JobId]) -> Array2<Time> {
  let jobs = seq.jobs();
  let mut durations = Array2::<Time>::zeros((chain.len(), seq.n_machines()));
  for (pos, &job) in chain.iter().enumerate() {
    durations.row_mut(pos).assign(jobs[job].times());
  }
  return durations;
}

// How long the synchronous cycle that holds position `pos` on machine `k` lasts.
//
// All machines advance together, so the cycle contains the jobs `steps`
// positions later on the machines before `k` and the earlier jobs on the
// machines after it; the longest of these operations sets the pace.
fn cycle_time(durations: &Array2<Time>, pos: usize, k: Machine) -> Time {
  let (n, m) = durations.dim();
  let steps = cmp::min(k, n - 1 - pos);

  let mut q = pos + steps;
  let mut machine = k - steps;
  let mut len: Time = 0.0;
  loop {
    len = len.max(durations[[q, machine]]);
    machine += 1;
    if q == 0 || machine >= m {
      break;
    }
    q -= 1;
  }

  return len;
}

fn synchronous(durations: &Array2<Time>) -> (Array2<Time>, Array1<Time>) {
  let (n, m) = durations.dim();
  let mut offsets = Array2::<Time>::zeros((n, m));
  let mut ends = Array1::<Time>::zeros(n);
  if m == 0 {
    return (offsets, ends);
  }

  let mut cycles = Array2::<Time>::zeros((n, m));
  for pos in 0..n {
    for k in 0..m {
      cycles[[pos, k]] = cycle_time(durations, pos, k);
    }
  }

  for pos in 0..n {
    for k in 0..m {
      offsets[[pos, k]] = if pos > 0 {
        offsets[[pos - 1, k]] + cycles[[pos - 1, k]]
      } else if k > 0 {
        offsets[[pos, k - 1]] + cycles[[pos, k - 1]]
      } else {
        0.0
      };
    }
    ends[pos] = offsets[[pos, m - 1]] + cycles[[pos, m - 1]];
  }

  return (offsets, ends);
}

fn asynchronous(durations: &Array2<Time>) -> (Array2<Time>, Array1<Time>) {
  let (n, m) = durations.dim();
  let mut offsets = Array2::<Time>::zeros((n, m));
  let mut ends = Array1::<Time>::zeros(n);
  if m == 0 {
    return (offsets, ends);
  }

  for pos in 0..n {
    for k in 0..m {
      let own_ready = if k > 0 {
        Some(offsets[[pos, k - 1]] + durations[[pos, k - 1]])
      } else {
        None
      };
      let machine_free = if pos > 0 {
        Some(offsets[[pos - 1, k]] + durations[[pos - 1, k]])
      } else {
        None
      };

      offsets[[pos, k]] = match (own_ready, machine_free) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => 0.0,
      };
    }
    ends[pos] = offsets[[pos, m - 1]] + durations[[pos, m - 1]];
  }

  return (offsets, ends);
}

fn no_wait(durations: &Array2<Time>) -> (Array2<Time>, Array1<Time>) {
  let (n, m) = durations.dim();
  let mut offsets = Array2::<Time>::zeros((n, m));
  let mut ends = Array1::<Time>::zeros(n);
  if m == 0 {
    return (offsets, ends);
  }

  // before[[pos, k]] = sum of the processing times of `pos` on machines 0..k
  let mut before = Array2::<Time>::zeros((n, m + 1));
  for pos in 0..n {
    for k in 0..m {
      before[[pos, k + 1]] = before[[pos, k]] + durations[[pos, k]];
    }
  }

  let mut start: Time = 0.0;
  for pos in 0..n {
    if pos > 0 {
      // The predecessor's partial completions must never trail this job's own pace.
      let delay = (0..m)
        .map(|k| before[[pos - 1, k + 1]] - before[[pos, k]])
        .fold(Time::NEG_INFINITY, Time::max);
      start += delay;
    }

    for k in 0..m {
      offsets[[pos, k]] = start + before[[pos, k]];
    }
    ends[pos] = start + before[[pos, m]];
  }

  return (offsets, ends);
}

fn blocking(durations: &Array2<Time>) -> (Array2<Time>, Array1<Time>) {
  let (n, m) = durations.dim();
  let mut offsets = Array2::<Time>::zeros((n, m));
  let mut ends = Array1::<Time>::zeros(n);
  if m == 0 {
    return (offsets, ends);
  }

  // departures[[pos, k]]: when `pos` releases machine `k`. Without buffers a
  // finished job stays put until its predecessor has left the next machine.
  let mut departures = Array2::<Time>::zeros((n, m));
  for pos in 0..n {
    for k in 0..m {
      let start = if k > 0 {
        departures[[pos, k - 1]]
      } else if pos > 0 {
        departures[[pos - 1, 0]]
      } else {
        0.0
      };
      let finish = start + durations[[pos, k]];

      offsets[[pos, k]] = start;
      departures[[pos, k]] = if pos > 0 && k + 1 < m {
        finish.max(departures[[pos - 1, k + 1]])
      } else {
        finish
      };
    }
    ends[pos] = departures[[pos, m - 1]];
  }

  return (offsets, ends);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::Instance;
  use crate::error::Error;

  fn sequence(times: Vec<Vec<Time>>) -> Sequence {
    return Sequence::new(Instance::from_times(times).unwrap());
  }

  fn two_jobs() -> Sequence {
    return sequence(vec![vec![3.0, 2.0], vec![1.0, 4.0]]);
  }

  fn three_jobs() -> Sequence {
    return sequence(vec![vec![1.0, 5.0], vec![1.0, 1.0], vec![5.0, 1.0]]);
  }

  #[test]
  fn synchronous_two_jobs_by_hand() {
    let schedule = compute(&two_jobs(), Variant::Synchronous);
    // cycles: A on M0 (3), B on M0 with A on M1 (max(1, 2)), B on M1 (4)
    assert_eq!(schedule.offset(0, 1).unwrap(), 3.0);
    assert_eq!(schedule.end_time(0).unwrap(), 5.0);
    assert_eq!(schedule.offset(1, 0).unwrap(), 3.0);
    assert_eq!(schedule.offset(1, 1).unwrap(), 5.0);
    assert_eq!(schedule.end_time(1).unwrap(), 9.0);
  }

  #[test]
  fn asynchronous_two_jobs_by_hand() {
    let schedule = compute(&two_jobs(), Variant::Asynchronous);
    assert_eq!(schedule.offset(1, 0).unwrap(), 3.0);
    assert_eq!(schedule.offset(1, 1).unwrap(), 5.0);
    assert_eq!(schedule.end_time(0).unwrap(), 5.0);
    assert_eq!(schedule.end_time(1).unwrap(), 9.0);
    assert_eq!(schedule.completion(1, 0).unwrap(), 4.0);
  }

  #[test]
  fn synchronous_cycle_is_paced_by_the_longest_operation() {
    let schedule = compute(&three_jobs(), Variant::Synchronous);
    assert_eq!(schedule.offsets().row(1).to_vec(), vec![1.0, 6.0]);
    assert_eq!(schedule.offsets().row(2).to_vec(), vec![6.0, 11.0]);
    assert_eq!(schedule.end_times().to_vec(), vec![6.0, 11.0, 12.0]);
  }

  #[test]
  fn asynchronous_lets_short_operations_proceed() {
    let schedule = compute(&three_jobs(), Variant::Asynchronous);
    assert_eq!(schedule.end_times().to_vec(), vec![6.0, 7.0, 8.0]);
  }

  #[test]
  fn no_wait_runs_machines_back_to_back() {
    let schedule = compute(&two_jobs(), Variant::NoWait);
    // B may not start before 3 on M0 and must reach M1 no earlier than 5
    assert_eq!(schedule.offset(1, 0).unwrap(), 4.0);
    assert_eq!(schedule.offset(1, 1).unwrap(), 5.0);
    assert_eq!(schedule.end_time(1).unwrap(), 9.0);

    let schedule = compute(&three_jobs(), Variant::NoWait);
    for job in 0..3 {
      assert_eq!(
        schedule.offset(job, 1).unwrap(),
        schedule.completion(job, 0).unwrap()
      );
    }
    assert_eq!(schedule.end_times().to_vec(), vec![6.0, 7.0, 12.0]);
  }

  #[test]
  fn blocking_holds_finished_jobs() {
    let schedule = compute(&three_jobs(), Variant::Blocking);
    // B finishes on M0 at 2 but A occupies M1 until 6
    assert_eq!(schedule.offset(1, 1).unwrap(), 6.0);
    assert_eq!(schedule.offset(2, 0).unwrap(), 6.0);
    assert_eq!(schedule.end_times().to_vec(), vec![6.0, 7.0, 12.0]);
  }

  #[test]
  fn blocking_matches_asynchronous_on_one_machine() {
    let seq = sequence(vec![vec![2.0], vec![3.0], vec![1.0]]);
    let blocking = compute(&seq, Variant::Blocking);
    let asynchronous = compute(&seq, Variant::Asynchronous);
    assert_eq!(blocking.end_times(), asynchronous.end_times());
    assert_eq!(blocking.end_times().to_vec(), vec![2.0, 5.0, 6.0]);
  }

  #[test]
  fn machine_out_of_range_is_invalid() {
    let schedule = compute(&two_jobs(), Variant::Asynchronous);
    assert!(matches!(schedule.offset(0, 2), Err(Error::InvalidArgument(_))));
    assert!(matches!(schedule.completion(0, 9), Err(Error::InvalidArgument(_))));
    assert!(matches!(schedule.end_time(2), Err(Error::InvalidArgument(_))));
  }

  #[test]
  fn follows_the_chain_not_the_load_order() {
    let mut seq = two_jobs();
    seq.swap(0, 1).unwrap();
    let schedule = compute(&seq, Variant::Asynchronous);
    assert_eq!(schedule.offset(1, 0).unwrap(), 0.0);
    assert_eq!(schedule.offset(0, 0).unwrap(), 1.0);
    assert_eq!(schedule.end_time(0).unwrap(), 7.0);
  }

  #[test]
  fn detached_jobs_are_timed_alone() {
    let mut seq = three_jobs();
    seq.unlink(0).unwrap();
    let schedule = compute(&seq, Variant::Asynchronous);
    assert_eq!(schedule.end_time(0).unwrap(), 6.0);
    assert_eq!(schedule.offset(1, 0).unwrap(), 0.0);
  }

  #[test]
  fn empty_sequence() {
    let seq = sequence(Vec::new());
    let schedule = compute(&seq, Variant::Blocking);
    assert_eq!(schedule.shape(), (0, 0));
  }
}
