use crate::data::JobId;
use crate::error::{invalid, Error, Result};
use crate::sequence::Sequence;
use log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
  Swap(JobId, JobId),
  /// Move the job into the slot the target occupies.
  Shift(JobId, JobId),
  Unlink(JobId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Pending,
  Done,
  Undone,
}

/// An undoable edit of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
  edit: Edit,
  state: State,
  // Adjacent swaps that lead a shifted job back, signed like a displacement.
  wayback: isize,
  // Neighbours of an unlinked job before it was taken out.
  neighbours: (Option<JobId>, Option<JobId>),
}

impl Command {
  pub fn new(edit: Edit) -> Self {
    Self {
      edit: edit,
      state: State::Pending,
      wayback: 0,
      neighbours: (None, None),
    }
  }

  pub fn swap(a: JobId, b: JobId) -> Self {
    return Self::new(Edit::Swap(a, b));
  }

  pub fn shift(job: JobId, target: JobId) -> Self {
    return Self::new(Edit::Shift(job, target));
  }

  pub fn unlink(job: JobId) -> Self {
    return Self::new(Edit::Unlink(job));
  }

  pub fn edit(&self) -> Edit {
    return self.edit;
  }

  pub fn state(&self) -> State {
    return self.state;
  }

  pub fn is_done(&self) -> bool {
    return self.state == State::Done;
  }

  pub fn run(&mut self, seq: &mut Sequence) -> Result<()> {
    if self.is_done() {
      return Err(Error::IllegalState(format!(
        "{:?} has already been done",
        self.edit
      )));
    }

    match self.edit {
      Edit::Swap(a, b) => seq.swap(a, b)?,
      Edit::Shift(job, target) => {
        let displacement = seq.shift_to(job, target)?;
        self.wayback = -displacement;
      }
      Edit::Unlink(job) => {
        let neighbours = (seq.predecessor(job)?, seq.successor(job)?);
        seq.unlink(job)?;
        self.neighbours = neighbours;
      }
    }

    log::debug!("Ran {:?}", self.edit);
    self.state = State::Done;
    Ok(())
  }

  pub fn undo(&mut self, seq: &mut Sequence) -> Result<()> {
    if !self.is_done() {
      return Err(Error::IllegalState(format!(
        "{:?} cannot be undone while {:?}",
        self.edit, self.state
      )));
    }

    match self.edit {
      Edit::Swap(a, b) => seq.swap(b, a)?,
      Edit::Shift(job, _) => self.replay_wayback(seq, job)?,
      Edit::Unlink(job) => match self.neighbours {
        (Some(p), _) => seq.insert_after(job, p)?,
        (None, Some(s)) => seq.insert_before(job, s)?,
        (None, None) => {}
      },
    }

    log::debug!("Undid {:?}", self.edit);
    self.state = State::Undone;
    Ok(())
  }

  // The target may have moved since, so the recorded number of adjacent
  // swaps is replayed rather than shifting back to the target.
  fn replay_wayback(&self, seq: &mut Sequence, job: JobId) -> Result<()> {
    let position = seq.position(job)?;
    let followers = seq.position(seq.last_follower(job)?)? - position;
    let steps = self.wayback.abs() as usize;
    let room = if self.wayback > 0 { followers } else { position };
    if steps > room {
      return invalid(format!(
        "job {} cannot move back {} positions, only {} available",
        job + 1,
        self.wayback,
        room
      ));
    }

    for _ in 0..steps {
      if self.wayback > 0 {
        seq.swap_with_next(job)?;
      } else {
        seq.swap_with_predecessor(job)?;
      }
    }
    Ok(())
  }
}

/// Linear undo/redo over two stacks. A new command drops everything that could be redone.
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
  done: Vec<Command>,
  undone: Vec<Command>,
}

impl CommandHistory {
  pub fn new() -> Self {
    return Self::default();
  }

  /// Runs `command` and records it. A command that fails is not recorded.
  pub fn run(&mut self, seq: &mut Sequence, mut command: Command) -> Result<()> {
    command.run(seq)?;
    self.done.push(command);
    self.undone.clear();
    Ok(())
  }

  /// Returns false if there was nothing to undo.
  pub fn undo(&mut self, seq: &mut Sequence) -> Result<bool> {
    let mut command = match self.done.pop() {
      Some(command) => command,
      None => return Ok(false),
    };

    if let Err(e) = command.undo(seq) {
      self.done.push(command);
      return Err(e);
    }
    self.undone.push(command);
    Ok(true)
  }

  /// Returns false if there was nothing to redo.
  pub fn redo(&mut self, seq: &mut Sequence) -> Result<bool> {
    let mut command = match self.undone.pop() {
      Some(command) => command,
      None => return Ok(false),
    };

    if let Err(e) = command.run(seq) {
      self.undone.push(command);
      return Err(e);
    }
    self.done.push(command);
    Ok(true)
  }

  pub fn can_undo(&self) -> bool {
    return !self.done.is_empty();
  }

  pub fn can_redo(&self) -> bool {
    return !self.undone.is_empty();
  }

  pub fn done(&self) -> &[Command] {
    return &self.done;
  }

  pub fn undone(&self) -> &[Command] {
    return &self.undone;
  }

  pub fn clear(&mut self) {
    self.done.clear();
    self.undone.clear();
  }
}
