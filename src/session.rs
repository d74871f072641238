use crate::command::{Command, CommandHistory};
use crate::data::{Instance, JobId, Machine, Time, Variant};
use crate::error::Result;
use crate::objective::{self, Objectives};
use crate::sequence::{Change, Sequence};
use crate::timing::{self, Schedule};
use log;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Config {
  pub variant: Variant,
  /// Whether job weights enter the weighted objectives; otherwise every weight is 1.
  pub weighted: bool,
}

/// One editable schedule: the sequence, its timing semantics and its edit history.
///
/// Every mutation bumps the sequence revision; the schedule is recomputed
/// lazily the next time it is asked for at a newer revision.
#[derive(Debug)]
pub struct Session {
  sequence: Sequence,
  config: Config,
  history: CommandHistory,
  memo: Option<(u64, Schedule)>,
}

impl Session {
  pub fn new(instance: Instance, config: Config) -> Self {
    return Self::from_sequence(Sequence::new(instance), config);
  }

  pub fn with_permutation(instance: Instance, order: &[JobId], config: Config) -> Result<Self> {
    let sequence = Sequence::with_permutation(instance, order)?;
    Ok(Self::from_sequence(sequence, config))
  }

  fn from_sequence(sequence: Sequence, config: Config) -> Self {
    Self {
      sequence: sequence,
      config: config,
      history: CommandHistory::new(),
      memo: None,
    }
  }

  /// Replaces the whole instance. The history is cleared and the listener kept.
  pub fn load(&mut self, instance: Instance, order: Option<&[JobId]>) -> Result<()> {
    let mut sequence = match order {
      Some(order) => Sequence::with_permutation(instance, order)?,
      None => Sequence::new(instance),
    };
    sequence.set_listener(self.sequence.take_listener());

    log::info!("Loaded {} jobs", sequence.n_jobs());
    self.sequence = sequence;
    self.history.clear();
    self.memo = None;
    self.sequence.notify(Change::Reconfigured);
    Ok(())
  }

  /// Installs the callback fired after every mutation.
  pub fn on_change<F: FnMut(&Change) + 'static>(&mut self, listener: F) {
    self.sequence.set_listener(Some(Box::new(listener)));
  }

  pub fn sequence(&self) -> &Sequence {
    return &self.sequence;
  }

  pub fn config(&self) -> Config {
    return self.config;
  }

  pub fn history(&self) -> &CommandHistory {
    return &self.history;
  }

  pub fn set_variant(&mut self, variant: Variant) {
    if self.config.variant != variant {
      log::debug!("Switching from {} to {}", self.config.variant, variant);
      self.config.variant = variant;
      self.sequence.notify(Change::Reconfigured);
    }
  }

  pub fn set_weighted(&mut self, weighted: bool) {
    if self.config.weighted != weighted {
      self.config.weighted = weighted;
      self.sequence.notify(Change::Reconfigured);
    }
  }

  pub fn position(&self, job: JobId) -> Result<usize> {
    return self.sequence.position(job);
  }

  pub fn run(&mut self, command: Command) -> Result<()> {
    return self.history.run(&mut self.sequence, command);
  }

  pub fn swap(&mut self, a: JobId, b: JobId) -> Result<()> {
    return self.run(Command::swap(a, b));
  }

  pub fn shift(&mut self, job: JobId, target: JobId) -> Result<()> {
    return self.run(Command::shift(job, target));
  }

  pub fn unlink(&mut self, job: JobId) -> Result<()> {
    return self.run(Command::unlink(job));
  }

  pub fn undo(&mut self) -> Result<bool> {
    return self.history.undo(&mut self.sequence);
  }

  pub fn redo(&mut self) -> Result<bool> {
    return self.history.redo(&mut self.sequence);
  }

  pub fn set_due_date(&mut self, job: JobId, due_date: Option<Time>) -> Result<()> {
    return self.sequence.set_due_date(job, due_date);
  }

  pub fn set_weight(&mut self, job: JobId, weight: Time) -> Result<()> {
    return self.sequence.set_weight(job, weight);
  }

  pub fn set_time(&mut self, job: JobId, machine: Machine, time: Time) -> Result<()> {
    return self.sequence.set_time(job, machine, time);
  }

  fn refreshed(&mut self) -> (&Sequence, &Schedule) {
    let revision = self.sequence.revision();
    if self.memo.as_ref().map_or(false, |(r, _)| *r != revision) {
      self.memo = None;
    }

    let sequence = &self.sequence;
    let variant = self.config.variant;
    let (_, schedule) = self.memo.get_or_insert_with(|| {
      log::debug!("Recomputing schedule at revision {}", revision);
      (revision, timing::compute(sequence, variant))
    });
    return (sequence, &*schedule);
  }

  /// The schedule of the current sequence under the active variant.
  pub fn schedule(&mut self) -> &Schedule {
    return self.refreshed().1;
  }

  pub fn objectives(&mut self) -> Result<Objectives> {
    let weighted = self.config.weighted;
    let (sequence, schedule) = self.refreshed();
    return objective::evaluate(sequence, schedule, weighted);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::JobRecord;
  use crate::error::Error;
  use std::cell::Cell;
  use std::rc::Rc;

  fn instance() -> Instance {
    return Instance::new(
      2,
      vec![
        JobRecord::new(0, vec![3.0, 2.0]).with_due_date(4.0),
        JobRecord::new(1, vec![1.0, 4.0]).with_due_date(6.0),
      ],
    )
    .unwrap();
  }

  fn config(variant: Variant) -> Config {
    return Config {
      variant: variant,
      weighted: false,
    };
  }

  #[test]
  fn edits_refresh_the_schedule() {
    let mut session = Session::new(instance(), config(Variant::Asynchronous));
    assert_eq!(session.schedule().end_time(1).unwrap(), 9.0);

    session.swap(0, 1).unwrap();
    assert_eq!(session.position(1).unwrap(), 0);
    assert_eq!(session.schedule().end_time(0).unwrap(), 7.0);
    assert_eq!(session.objectives().unwrap().cmax, 7.0);

    session.undo().unwrap();
    assert_eq!(session.objectives().unwrap().cmax, 9.0);
  }

  #[test]
  fn variant_switch_recomputes() {
    let mut session = Session::new(instance(), config(Variant::Asynchronous));
    assert_eq!(session.schedule().offset(1, 0).unwrap(), 3.0);
    session.set_variant(Variant::NoWait);
    assert_eq!(session.schedule().variant(), Variant::NoWait);
    assert_eq!(session.schedule().offset(1, 0).unwrap(), 4.0);
  }

  #[test]
  fn job_edits_recompute() {
    let mut session = Session::new(instance(), config(Variant::Asynchronous));
    assert_eq!(session.objectives().unwrap().lmax.unwrap().value, 3.0);
    session.set_due_date(1, Some(20.0)).unwrap();
    session.set_time(0, 0, 1.0).unwrap();
    // A now ends at 3, B at 7
    let lmax = session.objectives().unwrap().lmax.unwrap();
    assert_eq!(lmax.value, -1.0);
    assert_eq!(lmax.jobs, vec![0]);
  }

  #[test]
  fn weighting_flag_switches_weights() {
    let mut session = Session::new(instance(), config(Variant::Asynchronous));
    session.set_weight(1, 3.0).unwrap();
    assert_eq!(session.objectives().unwrap().weighted_completion, 5.0 + 9.0);
    session.set_weighted(true);
    assert_eq!(session.objectives().unwrap().weighted_completion, 5.0 + 27.0);
  }

  #[test]
  fn listener_sees_every_mutation() {
    let mut session = Session::new(instance(), config(Variant::Synchronous));
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    session.on_change(move |_| counter.set(counter.get() + 1));

    session.swap(0, 1).unwrap();
    session.undo().unwrap();
    session.redo().unwrap();
    session.set_weight(0, 2.0).unwrap();
    session.set_variant(Variant::Blocking);
    assert_eq!(calls.get(), 5);

    session.load(instance(), Some(&[1, 0][..])).unwrap();
    assert_eq!(calls.get(), 6);
    assert!(!session.history().can_undo());
    assert_eq!(session.sequence().order(), vec![1, 0]);
  }

  #[test]
  fn rejected_edits_do_not_enter_the_history() {
    let mut session = Session::new(instance(), config(Variant::Synchronous));
    assert!(matches!(session.shift(0, 2), Err(Error::InvalidArgument(_))));
    assert!(!session.history().can_undo());
    assert_eq!(session.undo().unwrap(), false);
  }

  #[test]
  fn unlink_is_undoable() {
    let mut session = Session::new(instance(), config(Variant::Asynchronous));
    session.unlink(0).unwrap();
    assert_eq!(session.objectives().unwrap().cmax, 5.0);
    session.undo().unwrap();
    assert_eq!(session.objectives().unwrap().cmax, 9.0);
    assert_eq!(session.sequence().order(), vec![0, 1]);
  }
}
