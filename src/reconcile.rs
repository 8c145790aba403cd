use std::collections::HashMap;

use crate::models::OpportunityRecord;

/// Entrance highlighting is applied to at most this many creations per
/// reconcile pass, so a large batch cannot queue hundreds of animations.
pub const ENTRANCE_CAP: usize = 30;
/// Each animated creation starts this many ticks after the previous one.
pub const ENTRANCE_STAGGER_TICKS: u32 = 1;
/// How long a card stays highlighted once its stagger delay has elapsed.
pub const ENTRANCE_TICKS: u32 = 6;

/// Opaque key into the card arena. Stays valid across reconcile passes
/// for as long as the card's record remains in the view; a stale handle
/// simply resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardHandle {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    fn for_score(score: f64) -> ScoreBand {
        if score >= 80.0 {
            ScoreBand::High
        } else if score >= 60.0 {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }
}

/// Display-ready card body, built once when the card is created. All text
/// is sanitized here so scraped content cannot smuggle terminal control
/// sequences into the draw pass.
#[derive(Debug, Clone)]
pub struct CardContent {
    pub company: String,
    pub title: String,
    pub location: String,
    pub stipend: String,
    pub duration: String,
    pub org_type: String,
    pub role_type: String,
    pub skills: String,
    pub footer: String,
    pub link: Option<String>,
    pub score: Option<(f64, ScoreBand)>,
    pub is_new: bool,
}

impl CardContent {
    pub fn build(record: &OpportunityRecord) -> CardContent {
        let location = if record.location.is_empty() {
            &record.location_type
        } else {
            &record.location
        };
        let stipend = if record.stipend.is_empty() {
            "Unpaid / Not Disclosed"
        } else {
            &record.stipend
        };
        let duration = if record.duration.is_empty() {
            "N/A"
        } else {
            &record.duration
        };
        let skills = if record.required_skills.is_empty() {
            "Not specified"
        } else {
            &record.required_skills
        };

        CardContent {
            company: sanitize(&record.company_name),
            title: sanitize(&record.role_title),
            location: sanitize(location),
            stipend: sanitize(stipend),
            duration: sanitize(duration),
            org_type: sanitize(&record.org_type),
            role_type: sanitize(&record.role_type),
            skills: sanitize(skills),
            footer: format!(
                "Via {} • {}",
                sanitize(&record.source_platform),
                sanitize(&record.date_scraped)
            ),
            link: validate_link(&record.apply_link),
            score: record.match_score.map(|s| (s, ScoreBand::for_score(s))),
            is_new: record.is_new,
        }
    }
}

/// Strip control characters so terminal escapes in scraped text cannot
/// corrupt the display. Tabs collapse to a space; everything printable
/// passes through unchanged.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if c == '\t' {
                Some(' ')
            } else if c.is_control() {
                None
            } else {
                Some(c)
            }
        })
        .collect()
}

/// Only http/https links free of whitespace and control bytes are usable
/// as navigation targets; anything else is replaced by a placeholder at
/// render time.
pub fn validate_link(link: &str) -> Option<String> {
    let trimmed = link.trim();
    let lower = trimmed.to_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return None;
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }
    Some(trimmed.to_string())
}

#[derive(Debug, Clone)]
struct Entrance {
    delay: u32,
    remaining: u32,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub id: String,
    pub content: CardContent,
    /// Display position in the current view, 0-based. Reordering touches
    /// only this value; the card itself never moves between slots.
    pub order: usize,
    entrance: Option<Entrance>,
}

impl Card {
    /// True while the entrance highlight is active (delay elapsed,
    /// duration not yet spent).
    pub fn is_entering(&self) -> bool {
        self.entrance
            .as_ref()
            .map(|e| e.delay == 0 && e.remaining > 0)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    card: Option<Card>,
}

/// What a reconcile pass did, for the status line and for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub removed: usize,
    pub reordered: usize,
    pub visible: usize,
}

/// Keyed store of materialized cards: record id -> handle -> arena slot.
///
/// The reconciler's contract: a card whose record is still present is
/// never destroyed and recreated, removals never shift surviving cards,
/// and a new view order is applied by rewriting order values only. The
/// whole store is torn down solely when the filtered view becomes empty.
#[derive(Debug, Default)]
pub struct CardStore {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_id: HashMap<String, CardHandle>,
    placeholder: bool,
}

impl CardStore {
    pub fn new() -> CardStore {
        CardStore::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// True when the last reconcile saw an empty view and the container
    /// should show the placeholder message instead of cards.
    pub fn showing_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn handle_of(&self, id: &str) -> Option<CardHandle> {
        self.by_id.get(id).copied()
    }

    pub fn card(&self, handle: CardHandle) -> Option<&Card> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.card.as_ref()
    }

    /// Handles of all live cards in display order.
    pub fn ordered(&self) -> Vec<CardHandle> {
        let mut handles: Vec<CardHandle> = self.by_id.values().copied().collect();
        handles.sort_by_key(|h| self.card(*h).map(|c| c.order).unwrap_or(usize::MAX));
        handles
    }

    /// Diff the store against a new ordered view and apply the plan:
    /// remove stale cards, create missing ones (entrance-animated up to
    /// the cap, staggered per creation index), then stamp every survivor
    /// with its new order value.
    pub fn reconcile(&mut self, view: &[OpportunityRecord]) -> ReconcileSummary {
        if view.is_empty() {
            let removed = self.by_id.len();
            self.clear();
            self.placeholder = true;
            return ReconcileSummary {
                removed,
                ..Default::default()
            };
        }
        self.placeholder = false;

        let valid: HashMap<&str, usize> = view
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut summary = ReconcileSummary {
            visible: view.len(),
            ..Default::default()
        };

        let stale: Vec<String> = self
            .by_id
            .keys()
            .filter(|id| !valid.contains_key(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.remove(&id);
            summary.removed += 1;
        }

        for (index, record) in view.iter().enumerate() {
            if self.by_id.contains_key(&record.id) {
                continue;
            }
            let entrance = if summary.created < ENTRANCE_CAP {
                Some(Entrance {
                    delay: summary.created as u32 * ENTRANCE_STAGGER_TICKS,
                    remaining: ENTRANCE_TICKS,
                })
            } else {
                None
            };
            self.insert(Card {
                id: record.id.clone(),
                content: CardContent::build(record),
                order: index,
                entrance,
            });
            summary.created += 1;
        }

        for (index, record) in view.iter().enumerate() {
            let Some(handle) = self.by_id.get(&record.id).copied() else {
                continue;
            };
            if let Some(slot) = self.slots.get_mut(handle.index) {
                if let Some(card) = slot.card.as_mut() {
                    if card.order != index {
                        card.order = index;
                        summary.reordered += 1;
                    }
                }
            }
        }

        summary
    }

    /// Advance entrance animations by one UI tick.
    pub fn tick(&mut self) {
        for slot in &mut self.slots {
            if let Some(card) = slot.card.as_mut() {
                if let Some(entrance) = card.entrance.as_mut() {
                    if entrance.delay > 0 {
                        entrance.delay -= 1;
                    } else if entrance.remaining > 0 {
                        entrance.remaining -= 1;
                    }
                    if entrance.delay == 0 && entrance.remaining == 0 {
                        card.entrance = None;
                    }
                }
            }
        }
    }

    fn insert(&mut self, card: Card) {
        let id = card.id.clone();
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.card = Some(card);
                CardHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    card: Some(card),
                });
                CardHandle {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.by_id.insert(id, handle);
    }

    fn remove(&mut self, id: &str) {
        if let Some(handle) = self.by_id.remove(id) {
            if let Some(slot) = self.slots.get_mut(handle.index) {
                slot.card = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index);
            }
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.by_id.clear();
    }
}
