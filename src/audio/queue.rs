//! Up-next list kept alongside the current track.
//!
//! The session only appends to and clears the queue. Nothing advances it
//! when a track finishes; that is left to whoever owns the UI.

use crate::audio::state::Track;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    tracks: Vec<Track>,
}

impl Queue {
    pub fn push(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let mut queue = Queue::default();
        let a = Track::new("a", "Aria", "Bach", "https://cdn.example/a.mp3");
        let b = Track::new("b", "Bolero", "Ravel", "https://cdn.example/b.mp3");
        queue.push(a.clone());
        queue.push(b.clone());
        queue.push(a.clone());

        let ids: Vec<_> = queue.tracks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "a"]);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }
}
