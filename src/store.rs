use crate::errors::{AppError, AppResult};
use crate::models::{Note, Selector};
use chrono::Utc;

/// Ordered in-memory notes. Insertion order is display order; ids come from a
/// counter that never goes backwards, so removed ids are never handed out
/// again. Callers provide exclusion.
#[derive(Debug)]
pub struct NoteStore {
    notes: Vec<Note>,
    next_id: i64,
}

impl Default for NoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteStore {
    pub fn new() -> Self {
        Self {
            notes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn add(&mut self, text: String, pinned: bool) -> Note {
        let note = Note {
            id: self.next_id,
            text,
            pinned,
            created_at: Utc::now(),
        };
        self.next_id += 1;
        self.notes.push(note.clone());
        note
    }

    pub fn list(&self) -> Vec<Note> {
        self.notes.clone()
    }

    pub fn resolve(&self, selector: &str) -> AppResult<Note> {
        let index = self.resolve_index(selector)?;
        Ok(self.notes[index].clone())
    }

    pub fn remove(&mut self, selector: &str) -> AppResult<Note> {
        let index = self.resolve_index(selector)?;
        Ok(self.notes.remove(index))
    }

    /// Drops every note but keeps the id counter. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.notes.len();
        self.notes.clear();
        dropped
    }

    pub fn pin(&mut self, selector: &str) -> AppResult<Note> {
        self.set_pinned(selector, true)
    }

    pub fn unpin(&mut self, selector: &str) -> AppResult<Note> {
        self.set_pinned(selector, false)
    }

    pub fn show(&self, selector: &str) -> AppResult<Note> {
        self.resolve(selector)
    }

    fn set_pinned(&mut self, selector: &str, pinned: bool) -> AppResult<Note> {
        let index = self.resolve_index(selector)?;
        let note = &mut self.notes[index];
        note.pinned = pinned;
        Ok(note.clone())
    }

    // Emptiness is checked before parsing: any selector on an empty store is
    // EmptyStore, even a malformed one.
    fn resolve_index(&self, selector: &str) -> AppResult<usize> {
        if self.notes.is_empty() {
            return Err(AppError::EmptyStore);
        }

        match Selector::parse(selector)? {
            Selector::First => Ok(0),
            Selector::Last => Ok(self.notes.len() - 1),
            Selector::Id(id) => self
                .notes
                .iter()
                .position(|note| note.id == id)
                .ok_or(AppError::NotFound(id)),
        }
    }
}
