use crate::error::{invalid, Error, Result};
use ndarray::Array1;
use std::fmt;
use std::str::FromStr;

pub type Machine = usize;
pub type Time = f64;

/// Processing times must be finite and not negative.
pub fn is_processing_time(time: Time) -> bool {
  return time.is_finite() && time >= 0.0;
}

/// Arena index of a job, 0-based. Displayed 1-based.
pub type JobId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
  id: JobId,
  times: Array1<Time>,
  due_date: Option<Time>,
  weight: Time,
}

impl JobRecord {
  pub fn new(id: JobId, times: Vec<Time>) -> Self {
    Self {
      id: id,
      times: Array1::from(times),
      due_date: None,
      weight: 1.0,
    }
  }

  pub fn with_due_date(mut self, due_date: Time) -> Self {
    self.set_due_date(Some(due_date));
    return self;
  }

  pub fn with_weight(mut self, weight: Time) -> Self {
    self.weight = weight;
    return self;
  }

  pub fn id(&self) -> JobId {
    return self.id;
  }

  /// The 1-based number shown to users.
  pub fn number(&self) -> usize {
    return self.id + 1;
  }

  pub fn n_machines(&self) -> usize {
    return self.times.len();
  }

  pub fn times(&self) -> &Array1<Time> {
    return &self.times;
  }

  pub fn time(&self, machine: Machine) -> Result<Time> {
    match self.times.get(machine) {
      Some(&t) => Ok(t),
      None => invalid(format!(
        "machine {} out of range 0..{} for job {}",
        machine,
        self.times.len(),
        self.number()
      )),
    }
  }

  pub fn due_date(&self) -> Option<Time> {
    return self.due_date;
  }

  pub fn weight(&self) -> Time {
    return self.weight;
  }

  // Negative due dates mean "no due date".
  pub(crate) fn set_due_date(&mut self, due_date: Option<Time>) {
    self.due_date = due_date.filter(|&d| d.is_finite() && d >= 0.0);
  }

  pub(crate) fn set_weight(&mut self, weight: Time) {
    self.weight = weight;
  }

  pub(crate) fn set_time(&mut self, machine: Machine, time: Time) -> Result<()> {
    self.time(machine)?;
    if !is_processing_time(time) {
      return invalid(format!("{} is not a processing time", time));
    }
    self.times[machine] = time;
    Ok(())
  }
}

/// A problem instance as handed over by a loader: all jobs share `n_machines`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
  n_machines: usize,
  jobs: Vec<JobRecord>,
}

impl Instance {
  pub fn new(n_machines: usize, jobs: Vec<JobRecord>) -> Result<Self> {
    for (index, job) in jobs.iter().enumerate() {
      if job.id != index {
        return invalid(format!("job at index {} carries id {}", index, job.id));
      }
      if job.n_machines() != n_machines {
        return invalid(format!(
          "job {} has {} processing times instead of {}",
          job.number(),
          job.n_machines(),
          n_machines
        ));
      }
      if let Some(t) = job.times.iter().find(|&&t| !is_processing_time(t)) {
        return invalid(format!("job {} has processing time {}", job.number(), t));
      }
    }

    Ok(Self {
      n_machines: n_machines,
      jobs: jobs,
    })
  }

  /// Builds an instance from raw processing-time rows, one row per job.
  pub fn from_times(times: Vec<Vec<Time>>) -> Result<Self> {
    let n_machines = times.first().map(|t| t.len()).unwrap_or(0);
    let jobs = times
      .into_iter()
      .enumerate()
      .map(|(id, t)| JobRecord::new(id, t))
      .collect();

    return Self::new(n_machines, jobs);
  }

  pub fn n_jobs(&self) -> usize {
    return self.jobs.len();
  }

  pub fn n_machines(&self) -> usize {
    return self.n_machines;
  }

  pub fn jobs(&self) -> &[JobRecord] {
    return &self.jobs;
  }

  pub(crate) fn into_jobs(self) -> Vec<JobRecord> {
    return self.jobs;
  }

  pub fn shape(&self) -> (usize, usize) {
    return (self.n_jobs(), self.n_machines);
  }
}

/// Timing semantics of the flow shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
  Synchronous,
  Asynchronous,
  NoWait,
  Blocking,
}

impl Variant {
  pub const NAMES: [&'static str; 4] = ["synchronous", "asynchronous", "no-wait", "blocking"];

  pub fn name(&self) -> &'static str {
    match self {
      Variant::Synchronous => Self::NAMES[0],
      Variant::Asynchronous => Self::NAMES[1],
      Variant::NoWait => Self::NAMES[2],
      Variant::Blocking => Self::NAMES[3],
    }
  }
}

impl Default for Variant {
  fn default() -> Self {
    Variant::Synchronous
  }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Variant {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "synchronous" => Ok(Variant::Synchronous),
      "asynchronous" => Ok(Variant::Asynchronous),
      "no-wait" | "nowait" => Ok(Variant::NoWait),
      "blocking" => Ok(Variant::Blocking),
      _ => invalid(format!("unknown variant {:?}", s)),
    }
  }
}
