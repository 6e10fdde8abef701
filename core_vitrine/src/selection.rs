use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bevy::prelude::Resource;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

use crate::content::ContentLibrary;
use vitrine_schema::{CellId, DisplayItem, SlotIdentity, SlotKind};

/// Chance that a composed review pick leads with the star-only family,
/// varying the pacing between text cards and quick star cards.
const STAR_ONLY_LEAD_CHANCE: f64 = 0.35;

const REVIEW_RECENT_MAX: usize = 26;
const REVIEW_RECENT_MIN: usize = 10;
const REVIEW_RECENT_POOL_DIVISOR: usize = 4;
const PHOTO_RECENT_MAX: usize = 12;
const PHOTO_RECENT_MIN: usize = 6;

const REVIEW_ATTEMPTS_MIN: usize = 12;
const REVIEW_ATTEMPTS_CAP: usize = 30;
const PHOTO_ATTEMPTS_MIN: usize = 10;
const PHOTO_ATTEMPTS_CAP: usize = 20;

const SELECTION_RNG_SALT: u64 = 0x5E1E_C7ED;

/// The three independent shuffle bags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagFamily {
    TextReviews,
    StarOnlyReviews,
    Photos,
}

impl BagFamily {
    fn kind(self) -> SlotKind {
        match self {
            BagFamily::TextReviews | BagFamily::StarOnlyReviews => SlotKind::Review,
            BagFamily::Photos => SlotKind::Photo,
        }
    }
}

/// Shared picker state for one grid instance.
///
/// Holds the shuffle bags, the recent-history windows and the occupancy map
/// of identities currently on screen. One instance is shared by every cell
/// of a grid; cells only touch it from within engine systems, so access is
/// single-writer by construction. A multi-threaded host would need to wrap
/// it in a mutex or actor boundary.
#[derive(Resource)]
pub struct SelectionEngine {
    library: Arc<ContentLibrary>,
    rng: SmallRng,
    text_bag: Vec<usize>,
    stars_bag: Vec<usize>,
    photo_bag: Vec<usize>,
    review_recent: Vec<SlotIdentity>,
    photo_recent: Vec<SlotIdentity>,
    slots: HashMap<CellId, SlotIdentity>,
    collisions: u64,
}

impl SelectionEngine {
    pub fn new(library: Arc<ContentLibrary>, seed: u64) -> Self {
        Self {
            library,
            rng: SmallRng::seed_from_u64(seed ^ SELECTION_RNG_SALT),
            text_bag: Vec::new(),
            stars_bag: Vec::new(),
            photo_bag: Vec::new(),
            review_recent: Vec::new(),
            photo_recent: Vec::new(),
            slots: HashMap::new(),
            collisions: 0,
        }
    }

    pub fn library(&self) -> &Arc<ContentLibrary> {
        &self.library
    }

    /// Restart all randomness from `seed`. Occupancy is kept; bags and
    /// recent-history windows start over.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed ^ SELECTION_RNG_SALT);
        self.text_bag.clear();
        self.stars_bag.clear();
        self.photo_bag.clear();
        self.review_recent.clear();
        self.photo_recent.clear();
    }

    fn pool_len(&self, family: BagFamily) -> usize {
        match family {
            BagFamily::TextReviews => self.library.with_text().len(),
            BagFamily::StarOnlyReviews => self.library.stars_only().len(),
            BagFamily::Photos => self.library.photo_count(),
        }
    }

    fn item_at(&self, family: BagFamily, index: usize) -> DisplayItem {
        match family {
            BagFamily::TextReviews => {
                DisplayItem::Review(self.library.review(self.library.with_text()[index]).clone())
            }
            BagFamily::StarOnlyReviews => {
                DisplayItem::Review(self.library.review(self.library.stars_only()[index]).clone())
            }
            BagFamily::Photos => DisplayItem::Photo(self.library.photos()[index].clone()),
        }
    }

    fn attempt_budget(&self, family: BagFamily) -> usize {
        let pool_len = self.pool_len(family);
        match family {
            BagFamily::Photos => PHOTO_ATTEMPTS_MIN.max(pool_len.min(PHOTO_ATTEMPTS_CAP)),
            _ => REVIEW_ATTEMPTS_MIN.max(pool_len.min(REVIEW_ATTEMPTS_CAP)),
        }
    }

    fn recent_limit(&self, family: BagFamily) -> usize {
        match family {
            BagFamily::Photos => {
                PHOTO_RECENT_MAX.min(PHOTO_RECENT_MIN.max(self.library.photo_count()))
            }
            _ => REVIEW_RECENT_MAX.min(
                REVIEW_RECENT_MIN.max(self.library.review_count() / REVIEW_RECENT_POOL_DIVISOR),
            ),
        }
    }

    /// Draw the next item from a family's shuffle bag.
    ///
    /// Pops indices off the back of the bag, setting aside any whose
    /// identity is currently on screen (`avoid`) or, unless
    /// `ignore_recent`, was shown too recently. On the first accepted item
    /// the set-aside indices are pushed back onto the front of the bag so
    /// they stay in the current cycle, and the accepted identity is recorded
    /// at the head of the family's recent window. Returns `None` only when
    /// the attempt budget runs out without an acceptable candidate.
    pub fn take_next(
        &mut self,
        family: BagFamily,
        avoid: &HashSet<SlotIdentity>,
        ignore_recent: bool,
    ) -> Option<DisplayItem> {
        let pool_len = self.pool_len(family);
        if pool_len == 0 {
            return None;
        }

        if self.bag(family).is_empty() {
            let fresh = self.shuffled_indices(pool_len);
            *self.bag_mut(family) = fresh;
        }

        let attempts = self.attempt_budget(family);
        let recent_limit = self.recent_limit(family);

        let mut rejected = Vec::new();
        let mut accepted = None;
        for _ in 0..attempts {
            let Some(index) = self.bag_mut(family).pop() else {
                break;
            };
            let identity = self.item_at(family, index).slot_identity();
            let recently_shown = !ignore_recent && self.recent(family).contains(&identity);
            if avoid.contains(&identity) || recently_shown {
                rejected.push(index);
                continue;
            }
            accepted = Some((index, identity));
            break;
        }

        if !rejected.is_empty() {
            let bag = self.bag_mut(family);
            let mut restored = rejected;
            restored.append(bag);
            *bag = restored;
        }

        let (index, identity) = accepted?;
        let recent = self.recent_mut(family);
        recent.insert(0, identity);
        recent.truncate(recent_limit);
        Some(self.item_at(family, index))
    }

    /// Composed review pick: weighted family preference, then the
    /// graceful-degradation chain. Never returns `None` for a non-empty
    /// review pool.
    pub fn pick_next_review(&mut self, avoid: &HashSet<SlotIdentity>) -> Option<DisplayItem> {
        let lead_stars = self.pool_len(BagFamily::StarOnlyReviews) > 0
            && self.rng.gen_bool(STAR_ONLY_LEAD_CHANCE);
        let (primary, fallback) = if lead_stars {
            (BagFamily::StarOnlyReviews, BagFamily::TextReviews)
        } else {
            (BagFamily::TextReviews, BagFamily::StarOnlyReviews)
        };

        self.take_next(primary, avoid, false)
            .or_else(|| self.take_next(fallback, avoid, false))
            .or_else(|| self.take_next(primary, avoid, true))
            .or_else(|| self.take_next(fallback, avoid, true))
            .or_else(|| self.first_not_avoided(primary, avoid))
            .or_else(|| self.first_not_avoided(fallback, avoid))
            .or_else(|| self.first_item(primary))
            .or_else(|| self.first_item(fallback))
    }

    /// Composed photo pick with the same degradation chain.
    pub fn pick_next_photo(&mut self, avoid: &HashSet<SlotIdentity>) -> Option<DisplayItem> {
        self.take_next(BagFamily::Photos, avoid, false)
            .or_else(|| self.take_next(BagFamily::Photos, avoid, true))
            .or_else(|| self.first_not_avoided(BagFamily::Photos, avoid))
            .or_else(|| self.first_item(BagFamily::Photos))
    }

    pub fn pick_next(
        &mut self,
        kind: SlotKind,
        avoid: &HashSet<SlotIdentity>,
    ) -> Option<DisplayItem> {
        match kind {
            SlotKind::Photo => self.pick_next_photo(avoid),
            SlotKind::Review => self.pick_next_review(avoid),
        }
    }

    fn first_not_avoided(
        &self,
        family: BagFamily,
        avoid: &HashSet<SlotIdentity>,
    ) -> Option<DisplayItem> {
        (0..self.pool_len(family))
            .map(|index| self.item_at(family, index))
            .find(|item| !avoid.contains(&item.slot_identity()))
    }

    fn first_item(&self, family: BagFamily) -> Option<DisplayItem> {
        (self.pool_len(family) > 0).then(|| self.item_at(family, 0))
    }

    /// Record which identity a cell is now displaying. A register that
    /// duplicates another cell's identity is tolerated (bounded-retry can
    /// lose the race) but counted.
    pub fn register_slot(&mut self, cell: CellId, identity: SlotIdentity) {
        let duplicate = self
            .slots
            .iter()
            .any(|(other, id)| *other != cell && *id == identity);
        if duplicate {
            self.collisions += 1;
        }
        self.slots.insert(cell, identity);
    }

    pub fn release_slot(&mut self, cell: CellId) -> Option<SlotIdentity> {
        self.slots.remove(&cell)
    }

    /// Identities currently on screen, the avoid-set for new picks.
    pub fn occupied(&self) -> HashSet<SlotIdentity> {
        self.slots.values().cloned().collect()
    }

    pub fn slot_identity(&self, cell: CellId) -> Option<&SlotIdentity> {
        self.slots.get(&cell)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn distinct_identities(&self) -> usize {
        self.occupied().len()
    }

    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    fn shuffled_indices(&mut self, len: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(&mut self.rng);
        indices
    }

    fn bag(&self, family: BagFamily) -> &Vec<usize> {
        match family {
            BagFamily::TextReviews => &self.text_bag,
            BagFamily::StarOnlyReviews => &self.stars_bag,
            BagFamily::Photos => &self.photo_bag,
        }
    }

    fn bag_mut(&mut self, family: BagFamily) -> &mut Vec<usize> {
        match family {
            BagFamily::TextReviews => &mut self.text_bag,
            BagFamily::StarOnlyReviews => &mut self.stars_bag,
            BagFamily::Photos => &mut self.photo_bag,
        }
    }

    fn recent(&self, family: BagFamily) -> &Vec<SlotIdentity> {
        match family.kind() {
            SlotKind::Review => &self.review_recent,
            SlotKind::Photo => &self.photo_recent,
        }
    }

    fn recent_mut(&mut self, family: BagFamily) -> &mut Vec<SlotIdentity> {
        match family.kind() {
            SlotKind::Review => &mut self.review_recent,
            SlotKind::Photo => &mut self.photo_recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentLibrary;
    use vitrine_schema::{PhotoId, PhotoRef, ReviewId, ReviewRecord, ReviewSource};

    fn review(id: &str, body: Option<&str>) -> ReviewRecord {
        ReviewRecord {
            id: ReviewId(id.to_string()),
            display_name: format!("Client {id}"),
            rating: 5,
            avatar: None,
            source: ReviewSource::Google,
            body: body.map(str::to_string),
        }
    }

    fn photo(public_id: &str) -> PhotoRef {
        PhotoRef {
            public_id: PhotoId(public_id.to_string()),
        }
    }

    fn tiny_library(text: usize, stars: usize, photos: usize) -> Arc<ContentLibrary> {
        let mut reviews = Vec::new();
        for i in 0..text {
            reviews.push(review(&format!("text-{i}"), Some("a fine shoot")));
        }
        for i in 0..stars {
            reviews.push(review(&format!("stars-{i}"), None));
        }
        let photos = (0..photos).map(|i| photo(&format!("photo-{i}"))).collect();
        Arc::new(ContentLibrary::from_parts(reviews, photos).expect("valid fixture"))
    }

    #[test]
    fn bag_covers_pool_before_repeating() {
        // Recent window (min 6) covers this pool, so history alone cannot
        // starve the draw; the bag must still hand out each photo exactly
        // once per cycle.
        let library = tiny_library(2, 0, 6);
        let mut engine = SelectionEngine::new(library, 7);
        let avoid = HashSet::new();

        let mut seen = Vec::new();
        for _ in 0..6 {
            let item = engine
                .take_next(BagFamily::Photos, &avoid, false)
                .expect("photo available");
            seen.push(item.slot_identity());
        }
        let unique: HashSet<_> = seen.iter().cloned().collect();
        assert_eq!(unique.len(), 6, "first full cycle repeated an item: {seen:?}");
    }

    #[test]
    fn avoid_set_leaves_only_the_free_identity() {
        let library = tiny_library(8, 0, 2);
        let mut engine = SelectionEngine::new(Arc::clone(&library), 11);

        let free = library.review(library.with_text()[3]).id.clone();
        let avoid: HashSet<_> = library
            .reviews()
            .iter()
            .filter(|r| r.id != free)
            .map(|r| SlotIdentity::Review(r.id.clone()))
            .collect();

        let item = engine
            .take_next(BagFamily::TextReviews, &avoid, true)
            .expect("the free identity is still in the bag");
        assert_eq!(item.slot_identity(), SlotIdentity::Review(free.clone()));

        // Once the bag's copy is consumed the raw take can starve, but the
        // composed pick keeps resolving to the only free identity.
        for _ in 0..5 {
            let item = engine.pick_next_review(&avoid).expect("never null");
            assert_eq!(item.slot_identity(), SlotIdentity::Review(free.clone()));
        }
    }

    #[test]
    fn single_item_pool_never_deadlocks() {
        let library = tiny_library(1, 0, 1);
        let mut engine = SelectionEngine::new(library, 3);

        // Even with the lone identity in both the avoid-set and history,
        // the composed pick falls through to the unconditional tail.
        let avoid: HashSet<_> = [SlotIdentity::Photo(PhotoId("photo-0".to_string()))]
            .into_iter()
            .collect();
        for _ in 0..10 {
            let item = engine.pick_next_photo(&avoid).expect("never null");
            assert_eq!(
                item.slot_identity(),
                SlotIdentity::Photo(PhotoId("photo-0".to_string()))
            );
        }
    }

    #[test]
    fn rejected_indices_return_to_the_bag() {
        let library = tiny_library(2, 0, 4);
        let mut engine = SelectionEngine::new(library, 5);

        // Blocklist two photos; the other two keep being served and the
        // blocked ones survive in the bag for when the avoid-set clears.
        let avoid: HashSet<_> = [
            SlotIdentity::Photo(PhotoId("photo-0".to_string())),
            SlotIdentity::Photo(PhotoId("photo-1".to_string())),
        ]
        .into_iter()
        .collect();

        let mut served = HashSet::new();
        for _ in 0..4 {
            if let Some(item) = engine.take_next(BagFamily::Photos, &avoid, true) {
                served.insert(item.slot_identity());
            }
        }
        assert!(!served.contains(&SlotIdentity::Photo(PhotoId("photo-0".to_string()))));
        assert!(!served.contains(&SlotIdentity::Photo(PhotoId("photo-1".to_string()))));

        let open = HashSet::new();
        let mut later = HashSet::new();
        for _ in 0..8 {
            if let Some(item) = engine.take_next(BagFamily::Photos, &open, true) {
                later.insert(item.slot_identity());
            }
        }
        assert!(later.contains(&SlotIdentity::Photo(PhotoId("photo-0".to_string()))));
        assert!(later.contains(&SlotIdentity::Photo(PhotoId("photo-1".to_string()))));
    }

    #[test]
    fn recent_history_rejects_until_ignored() {
        // Four text reviews against a recent window of ten: once the whole
        // pool has been shown, plain takes starve until history is ignored.
        let library = tiny_library(4, 0, 2);
        let mut engine = SelectionEngine::new(library, 13);
        let avoid = HashSet::new();

        let mut seen = HashSet::new();
        for _ in 0..4 {
            let item = engine
                .take_next(BagFamily::TextReviews, &avoid, false)
                .expect("pick");
            seen.insert(item.slot_identity());
        }
        assert_eq!(seen.len(), 4);

        assert!(engine
            .take_next(BagFamily::TextReviews, &avoid, false)
            .is_none());
        assert!(engine
            .take_next(BagFamily::TextReviews, &avoid, true)
            .is_some());
    }

    #[test]
    fn released_slot_identity_becomes_pickable_again() {
        let library = tiny_library(2, 0, 1);
        let mut engine = SelectionEngine::new(library, 17);

        let only_photo = SlotIdentity::Photo(PhotoId("photo-0".to_string()));
        engine.register_slot(CellId(3), only_photo.clone());

        engine.release_slot(CellId(3));
        let avoid = engine.occupied();
        assert!(avoid.is_empty());
        let item = engine
            .take_next(BagFamily::Photos, &avoid, true)
            .expect("free again");
        assert_eq!(item.slot_identity(), only_photo);
    }

    #[test]
    fn duplicate_registration_is_tolerated_and_counted() {
        let library = tiny_library(2, 0, 2);
        let mut engine = SelectionEngine::new(library, 19);

        let identity = SlotIdentity::Photo(PhotoId("photo-0".to_string()));
        engine.register_slot(CellId(0), identity.clone());
        engine.register_slot(CellId(1), identity.clone());
        assert_eq!(engine.collisions(), 1);
        assert_eq!(engine.slot_count(), 2);
        assert_eq!(engine.distinct_identities(), 1);

        // Re-registering the same cell with its own identity is not a
        // collision.
        engine.register_slot(CellId(0), identity);
        assert_eq!(engine.collisions(), 2);
    }

    #[test]
    fn composed_review_pick_serves_both_families() {
        let library = tiny_library(6, 6, 2);
        let mut engine = SelectionEngine::new(library, 23);
        let avoid = HashSet::new();

        let mut text_seen = false;
        let mut stars_seen = false;
        for _ in 0..40 {
            match engine.pick_next_review(&avoid) {
                Some(DisplayItem::Review(record)) => {
                    if record.has_text() {
                        text_seen = true;
                    } else {
                        stars_seen = true;
                    }
                }
                other => panic!("expected review, got {other:?}"),
            }
        }
        assert!(text_seen && stars_seen);
    }
}
