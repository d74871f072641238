use crate::data::{Instance, JobId, JobRecord, Machine, Time};
use crate::error::{invalid, Error, Result};
use itertools::Itertools;
use log;
use ndarray::Array1;
use std::fmt;

/// What a mutation did, handed to the change listener.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
  Linked(JobId, JobId),
  Unlinked(JobId),
  Inserted(JobId),
  Swapped(JobId, JobId),
  Shifted { job: JobId, displacement: isize },
  JobEdited(JobId),
  /// Something outside the chain changed, e.g. the variant or the whole instance.
  Reconfigured,
}

pub type Listener = Box<dyn FnMut(&Change)>;

/// The job order as a doubly linked chain over an arena of job records.
///
/// Links are stored as optional arena indices, mirrored in `pred` and `succ`.
/// The jobs reachable from the scheduled head form the permutation being
/// evaluated; jobs taken out with `unlink` are detached until linked again.
pub struct Sequence {
  n_machines: usize,
  jobs: Vec<JobRecord>,

  pred: Array1<Option<JobId>>,
  succ: Array1<Option<JobId>>,
  detached: Array1<bool>,

  revision: u64,
  listener: Option<Listener>,
}

impl Sequence {
  /// Links the jobs in load order.
  pub fn new(instance: Instance) -> Self {
    let order: Vec<JobId> = (0..instance.n_jobs()).collect();
    return Self::build(instance, &order);
  }

  /// Links the jobs in the given order, which must be a permutation of all job ids.
  pub fn with_permutation(instance: Instance, order: &[JobId]) -> Result<Self> {
    let n = instance.n_jobs();
    if order.len() != n {
      return invalid(format!(
        "permutation has {} entries but the instance has {} jobs",
        order.len(),
        n
      ));
    }

    let mut seen = Array1::<bool>::from_elem(n, false);
    for &job in order {
      if job >= n {
        return invalid(format!("job {} is not part of the instance", job + 1));
      }
      if seen[job] {
        return invalid(format!("job {} appears twice in the permutation", job + 1));
      }
      seen[job] = true;
    }

    Ok(Self::build(instance, order))
  }

  fn build(instance: Instance, order: &[JobId]) -> Self {
    let n = instance.n_jobs();
    let mut pred = Array1::<Option<JobId>>::from_elem(n, None);
    let mut succ = Array1::<Option<JobId>>::from_elem(n, None);

    for (&a, &b) in order.iter().tuple_windows() {
      succ[a] = Some(b);
      pred[b] = Some(a);
    }

    log::debug!(
      "Built sequence of {} jobs on {} machines",
      n,
      instance.n_machines()
    );

    Self {
      n_machines: instance.n_machines(),
      jobs: instance.into_jobs(),
      pred: pred,
      succ: succ,
      detached: Array1::<bool>::from_elem(n, false),
      revision: 0,
      listener: None,
    }
  }

  pub fn set_listener(&mut self, listener: Option<Listener>) {
    self.listener = listener;
  }

  pub(crate) fn take_listener(&mut self) -> Option<Listener> {
    return self.listener.take();
  }

  /// Incremented by every mutation; derived data computed at an older revision is stale.
  pub fn revision(&self) -> u64 {
    return self.revision;
  }

  pub(crate) fn notify(&mut self, change: Change) {
    self.revision += 1;
    log::trace!("revision {}: {:?}", self.revision, change);
    if let Some(listener) = self.listener.as_mut() {
      listener(&change);
    }
  }

  pub fn n_jobs(&self) -> usize {
    return self.jobs.len();
  }

  pub fn n_machines(&self) -> usize {
    return self.n_machines;
  }

  pub fn is_empty(&self) -> bool {
    return self.jobs.is_empty();
  }

  pub fn jobs(&self) -> &[JobRecord] {
    return &self.jobs;
  }

  pub fn job(&self, job: JobId) -> Result<&JobRecord> {
    self.check(job)?;
    Ok(&self.jobs[job])
  }

  fn check(&self, job: JobId) -> Result<()> {
    if job >= self.jobs.len() {
      return invalid(format!(
        "job {} out of range 1..={}",
        job + 1,
        self.jobs.len()
      ));
    }
    Ok(())
  }

  pub fn predecessor(&self, job: JobId) -> Result<Option<JobId>> {
    self.check(job)?;
    Ok(self.pred[job])
  }

  pub fn successor(&self, job: JobId) -> Result<Option<JobId>> {
    self.check(job)?;
    Ok(self.succ[job])
  }

  pub fn is_detached(&self, job: JobId) -> Result<bool> {
    self.check(job)?;
    Ok(self.detached[job])
  }

  /// Number of predecessors of `job`, i.e. its 0-based index in its chain.
  pub fn position(&self, job: JobId) -> Result<usize> {
    self.check(job)?;
    let mut position = 0;
    let mut current = job;
    while let Some(p) = self.pred[current] {
      position += 1;
      current = p;
    }
    Ok(position)
  }

  pub fn first_predecessor(&self, job: JobId) -> Result<JobId> {
    self.check(job)?;
    return Ok(self.head_of(job));
  }

  pub fn last_follower(&self, job: JobId) -> Result<JobId> {
    self.check(job)?;
    let mut current = job;
    while let Some(s) = self.succ[current] {
      current = s;
    }
    Ok(current)
  }

  fn head_of(&self, job: JobId) -> JobId {
    let mut current = job;
    while let Some(p) = self.pred[current] {
      current = p;
    }
    return current;
  }

  fn walk(&self, head: JobId) -> Vec<JobId> {
    let mut chain = vec![head];
    let mut current = head;
    while let Some(s) = self.succ[current] {
      chain.push(s);
      current = s;
    }
    return chain;
  }

  /// Head of the scheduled chain, `None` if every job is detached.
  pub fn head(&self) -> Option<JobId> {
    return (0..self.n_jobs()).find(|&j| self.pred[j].is_none() && !self.detached[j]);
  }

  /// Jobs of the scheduled chain from head to tail.
  pub fn order(&self) -> Vec<JobId> {
    match self.head() {
      Some(head) => self.walk(head),
      None => Vec::new(),
    }
  }

  /// Every chain, scheduled or detached, each from head to tail.
  pub fn chains(&self) -> Vec<Vec<JobId>> {
    return (0..self.n_jobs())
      .filter(|&j| self.pred[j].is_none())
      .map(|head| self.walk(head))
      .collect();
  }

  fn same_chain(&self, a: JobId, b: JobId) -> Result<()> {
    self.check(a)?;
    self.check(b)?;
    if self.head_of(a) != self.head_of(b) {
      return invalid(format!(
        "jobs {} and {} are not in the same chain",
        a + 1,
        b + 1
      ));
    }
    Ok(())
  }

  /// Appends the chain starting at `b` to the chain ending at `a`.
  pub fn link(&mut self, a: JobId, b: JobId) -> Result<()> {
    self.check(a)?;
    self.check(b)?;
    if let Some(s) = self.succ[a] {
      return invalid(format!("job {} is already followed by job {}", a + 1, s + 1));
    }
    if let Some(p) = self.pred[b] {
      return invalid(format!("job {} is already preceded by job {}", b + 1, p + 1));
    }
    if self.head_of(a) == b {
      return invalid(format!(
        "linking job {} to job {} would close a cycle",
        a + 1,
        b + 1
      ));
    }

    self.succ[a] = Some(b);
    self.pred[b] = Some(a);
    self.merge_detached(a, b);

    self.notify(Change::Linked(a, b));
    Ok(())
  }

  // Two chains just joined through `a` and `b`. The result stays scheduled
  // if either side was.
  fn merge_detached(&mut self, a: JobId, b: JobId) {
    let detached = self.detached[a] && self.detached[b];
    for job in self.walk(self.head_of(a)) {
      self.detached[job] = detached;
    }
  }

  /// Takes `job` out of its chain and closes the gap. The job becomes detached.
  pub fn unlink(&mut self, job: JobId) -> Result<()> {
    self.check(job)?;
    let (p, s) = (self.pred[job], self.succ[job]);
    if p.is_none() && s.is_none() {
      return Ok(());
    }

    if let Some(p) = p {
      self.succ[p] = s;
    }
    if let Some(s) = s {
      self.pred[s] = p;
    }
    self.pred[job] = None;
    self.succ[job] = None;
    self.detached[job] = true;

    self.notify(Change::Unlinked(job));
    Ok(())
  }

  fn check_insertable(&self, job: JobId, anchor: JobId) -> Result<()> {
    self.check(job)?;
    self.check(anchor)?;
    if job == anchor {
      return invalid(format!("job {} cannot be inserted next to itself", job + 1));
    }
    if self.pred[job].is_some() || self.succ[job].is_some() {
      return invalid(format!("job {} is still linked", job + 1));
    }
    Ok(())
  }

  /// Splices the singleton `job` directly behind `anchor`.
  pub fn insert_after(&mut self, job: JobId, anchor: JobId) -> Result<()> {
    self.check_insertable(job, anchor)?;

    let s = self.succ[anchor];
    if let Some(s) = s {
      self.pred[s] = Some(job);
    }
    self.succ[job] = s;
    self.pred[job] = Some(anchor);
    self.succ[anchor] = Some(job);
    self.merge_detached(job, anchor);

    self.notify(Change::Inserted(job));
    Ok(())
  }

  /// Splices the singleton `job` directly in front of `anchor`.
  pub fn insert_before(&mut self, job: JobId, anchor: JobId) -> Result<()> {
    self.check_insertable(job, anchor)?;

    let p = self.pred[anchor];
    if let Some(p) = p {
      self.succ[p] = Some(job);
    }
    self.pred[job] = p;
    self.succ[job] = Some(anchor);
    self.pred[anchor] = Some(job);
    self.merge_detached(job, anchor);

    self.notify(Change::Inserted(job));
    Ok(())
  }

  // Exchanges `a` with its predecessor. Returns false if there is none.
  fn relink_with_pred(&mut self, a: JobId) -> bool {
    let p = match self.pred[a] {
      Some(p) => p,
      None => return false,
    };

    let pp = self.pred[p];
    if let Some(pp) = pp {
      self.succ[pp] = Some(a);
    }
    self.pred[a] = pp;

    let s = self.succ[a];
    if let Some(s) = s {
      self.pred[s] = Some(p);
    }
    self.succ[p] = s;

    self.succ[a] = Some(p);
    self.pred[p] = Some(a);
    return true;
  }

  fn relink_with_next(&mut self, a: JobId) -> bool {
    match self.succ[a] {
      Some(s) => self.relink_with_pred(s),
      None => false,
    }
  }

  // Exchanges two jobs that are not neighbours.
  fn relink_apart(&mut self, a: JobId, b: JobId) {
    let (pa, sa) = (self.pred[a], self.succ[a]);
    let (pb, sb) = (self.pred[b], self.succ[b]);

    self.pred[a] = pb;
    self.succ[a] = sb;
    self.pred[b] = pa;
    self.succ[b] = sa;

    if let Some(x) = pa {
      self.succ[x] = Some(b);
    }
    if let Some(x) = sa {
      self.pred[x] = Some(b);
    }
    if let Some(x) = pb {
      self.succ[x] = Some(a);
    }
    if let Some(x) = sb {
      self.pred[x] = Some(a);
    }
  }

  /// Exchanges the positions of `a` and `b`, which must share a chain.
  pub fn swap(&mut self, a: JobId, b: JobId) -> Result<()> {
    self.same_chain(a, b)?;
    if a == b {
      return Ok(());
    }

    if self.succ[a] == Some(b) {
      self.relink_with_pred(b);
    } else if self.pred[a] == Some(b) {
      self.relink_with_pred(a);
    } else {
      self.relink_apart(a, b);
    }

    self.notify(Change::Swapped(a, b));
    Ok(())
  }

  /// Returns whether a swap happened.
  pub fn swap_with_predecessor(&mut self, a: JobId) -> Result<bool> {
    self.check(a)?;
    let p = match self.pred[a] {
      Some(p) => p,
      None => return Ok(false),
    };
    self.relink_with_pred(a);
    self.notify(Change::Swapped(p, a));
    Ok(true)
  }

  /// Returns whether a swap happened.
  pub fn swap_with_next(&mut self, a: JobId) -> Result<bool> {
    self.check(a)?;
    let s = match self.succ[a] {
      Some(s) => s,
      None => return Ok(false),
    };
    self.relink_with_next(a);
    self.notify(Change::Swapped(a, s));
    Ok(true)
  }

  /// Moves `job` into the slot `target` occupies right now by adjacent swaps.
  ///
  /// Returns the signed displacement of `job`, positive if it moved later.
  /// Replaying that many adjacent swaps in the opposite direction restores
  /// the previous order, independent of where `target` ends up.
  pub fn shift_to(&mut self, job: JobId, target: JobId) -> Result<isize> {
    self.same_chain(job, target)?;
    if job == target {
      return Ok(0);
    }

    let from = self.position(job)? as isize;
    let to = self.position(target)? as isize;
    let displacement = to - from;
    log::trace!(
      "shift_to({}, {}): {} -> {}",
      job + 1,
      target + 1,
      from,
      to
    );

    for _ in 0..displacement.abs() {
      if displacement > 0 {
        self.relink_with_next(job);
      } else {
        self.relink_with_pred(job);
      }
    }

    self.notify(Change::Shifted {
      job: job,
      displacement: displacement,
    });
    Ok(displacement)
  }

  /// Sets the due date of `job`; `None` or a negative value removes it.
  pub fn set_due_date(&mut self, job: JobId, due_date: Option<Time>) -> Result<()> {
    self.check(job)?;
    self.jobs[job].set_due_date(due_date);
    self.notify(Change::JobEdited(job));
    Ok(())
  }

  pub fn set_weight(&mut self, job: JobId, weight: Time) -> Result<()> {
    self.check(job)?;
    self.jobs[job].set_weight(weight);
    self.notify(Change::JobEdited(job));
    Ok(())
  }

  pub fn set_time(&mut self, job: JobId, machine: Machine, time: Time) -> Result<()> {
    self.check(job)?;
    self.jobs[job].set_time(machine, time)?;
    self.notify(Change::JobEdited(job));
    Ok(())
  }

  /// Checks the link invariants: mirrored links, no cycles, every job on
  /// exactly one chain, and exactly one scheduled chain unless empty.
  pub fn verify(&self) -> Result<()> {
    let n = self.n_jobs();
    for job in 0..n {
      if let Some(p) = self.pred[job] {
        if p >= n || self.succ[p] != Some(job) {
          Err(broken(format!(
            "job {} names {} as predecessor without the mirrored link",
            job + 1,
            p + 1
          )))?;
        }
      }
      if let Some(s) = self.succ[job] {
        if s >= n || self.pred[s] != Some(job) {
          Err(broken(format!(
            "job {} names {} as successor without the mirrored link",
            job + 1,
            s + 1
          )))?;
        }
      }
    }

    let mut visited = Array1::<bool>::from_elem(n, false);
    let mut scheduled_heads = 0;
    for head in (0..n).filter(|&j| self.pred[j].is_none()) {
      if !self.detached[head] {
        scheduled_heads += 1;
      }
      let mut current = Some(head);
      while let Some(job) = current {
        if visited[job] {
          Err(broken(format!("job {} is reached twice", job + 1)))?;
        }
        if self.detached[job] != self.detached[head] {
          Err(broken(format!(
            "job {} disagrees with its chain about being scheduled",
            job + 1
          )))?;
        }
        visited[job] = true;
        current = self.succ[job];
      }
    }

    if let Some(job) = visited.iter().position(|&v| !v) {
      Err(broken(format!("job {} is not reachable from any head", job + 1)))?;
    }
    if n > 0 && scheduled_heads == 0 {
      Err(broken("no scheduled chain".to_string()))?;
    }
    if scheduled_heads > 1 {
      Err(broken(format!("{} scheduled chains", scheduled_heads)))?;
    }

    Ok(())
  }
}

fn broken(message: String) -> Error {
  return Error::IllegalState(format!("broken chain: {}", message));
}

impl fmt::Debug for Sequence {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("Sequence")
      .field("n_machines", &self.n_machines)
      .field("order", &self.order())
      .field("revision", &self.revision)
      .field("listener", &self.listener.is_some())
      .finish()
  }
}
