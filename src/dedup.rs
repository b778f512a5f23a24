use std::collections::HashMap;

use crate::{models::Movie, normalize::normalize_movie_name};

/// The fields the deduplicator looks at.
pub trait Deduplicatable {
    fn name(&self) -> &str;
    fn poster_link(&self) -> &str;
    fn popularity(&self) -> Option<f64>;
}

impl Deduplicatable for Movie {
    fn name(&self) -> &str {
        &self.name
    }

    fn poster_link(&self) -> &str {
        &self.poster_link
    }

    fn popularity(&self) -> Option<f64> {
        self.tmdb_popularity
    }
}

fn has_poster<T: Deduplicatable>(movie: &T) -> bool {
    let link = movie.poster_link();
    !link.is_empty() && !link.contains("noposter")
}

fn prefer_incoming<T: Deduplicatable>(existing: &T, incoming: &T) -> bool {
    match (has_poster(existing), has_poster(incoming)) {
        (false, true) => true,
        (true, false) => false,
        _ => incoming.popularity().unwrap_or(0.0) > existing.popularity().unwrap_or(0.0),
    }
}

/// Collapses release variants onto one record per normalized name, keeping
/// the order in which each name first appeared. A record with a real poster
/// wins, then the more popular one; ties keep the first seen.
pub fn deduplicate_movies<T: Deduplicatable>(movies: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut slots: Vec<T> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for movie in movies {
        let key = normalize_movie_name(movie.name());
        match index.get(&key) {
            None => {
                index.insert(key, slots.len());
                slots.push(movie);
            },
            Some(&slot) => {
                if prefer_incoming(&slots[slot], &movie) {
                    slots[slot] = movie;
                }
            },
        }
    }

    slots
}
