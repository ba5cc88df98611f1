//! In-memory store of the current account state.
//!
//! The registry holds one `Arc<Snapshot>` behind a `watch` channel.
//! A refresh replaces the whole snapshot in a single send, so a reader
//! that grabbed the snapshot sees lists, meals, recipes and labels from
//! the same fetch.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use tokio::sync::watch;
use tracing::info;

use crate::models::{Item, Meal, MealPlanLabel, ModelError, Recipe, ShoppingList};
use crate::snapshot::Snapshot;

/// A date accepted by [`EntityRegistry::meals_for_date`].
#[derive(Debug, Clone, PartialEq)]
pub enum DateQuery {
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    Text(String),
    /// A calendar day, used as is
    Day(NaiveDate),
    /// An instant with its own offset
    Instant(DateTime<FixedOffset>),
}

impl DateQuery {
    /// Resolves the query to a calendar day in `zone`.
    ///
    /// Each instant takes the offset `zone` reports for that instant, so a
    /// zone with daylight saving time resolves winter and summer dates with
    /// different offsets.
    pub fn to_day<Tz: TimeZone>(&self, zone: &Tz) -> Result<NaiveDate, ModelError> {
        match self {
            DateQuery::Timestamp(millis) => DateTime::from_timestamp_millis(*millis)
                .map(|dt| dt.with_timezone(zone).date_naive())
                .ok_or_else(|| ModelError::Validation(format!("Invalid date \"{}\"", millis))),
            DateQuery::Text(text) => {
                let text = text.trim();
                if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                    return Ok(day);
                }
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(zone).date_naive())
                    .map_err(|_| ModelError::Validation(format!("Invalid date \"{}\"", text)))
            }
            DateQuery::Day(day) => Ok(*day),
            DateQuery::Instant(dt) => Ok(dt.with_timezone(zone).date_naive()),
        }
    }
}

impl From<i64> for DateQuery {
    fn from(millis: i64) -> Self {
        DateQuery::Timestamp(millis)
    }
}

impl From<&str> for DateQuery {
    fn from(text: &str) -> Self {
        DateQuery::Text(text.to_string())
    }
}

impl From<String> for DateQuery {
    fn from(text: String) -> Self {
        DateQuery::Text(text)
    }
}

impl From<NaiveDate> for DateQuery {
    fn from(day: NaiveDate) -> Self {
        DateQuery::Day(day)
    }
}

impl From<DateTime<FixedOffset>> for DateQuery {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        DateQuery::Instant(dt)
    }
}

impl From<DateTime<Utc>> for DateQuery {
    fn from(dt: DateTime<Utc>) -> Self {
        DateQuery::Instant(dt.fixed_offset())
    }
}

impl From<DateTime<Local>> for DateQuery {
    fn from(dt: DateTime<Local>) -> Self {
        DateQuery::Instant(dt.fixed_offset())
    }
}

/// Time zone used to turn instants into calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The machine's zone, with the offset in effect at each instant
    Local,
    /// One offset for every instant
    Fixed(FixedOffset),
}

impl Zone {
    /// Calendar day `query` falls on in this zone.
    pub fn day_of(&self, query: &DateQuery) -> Result<NaiveDate, ModelError> {
        match self {
            Zone::Local => query.to_day(&Local),
            Zone::Fixed(offset) => query.to_day(offset),
        }
    }

    /// Today's calendar day in this zone.
    pub fn today(&self) -> NaiveDate {
        let now = Utc::now();
        match self {
            Zone::Local => now.with_timezone(&Local).date_naive(),
            Zone::Fixed(offset) => now.with_timezone(offset).date_naive(),
        }
    }
}

impl From<FixedOffset> for Zone {
    fn from(offset: FixedOffset) -> Self {
        Zone::Fixed(offset)
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Zone::Local => write!(f, "local"),
            Zone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

/// Process-owned store of the latest snapshot.
#[derive(Debug)]
pub struct EntityRegistry {
    current: watch::Sender<Arc<Snapshot>>,
    zone: Zone,
}

impl EntityRegistry {
    /// Creates an empty registry that resolves date queries in `zone`.
    pub fn new(zone: impl Into<Zone>) -> Self {
        let (current, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            current,
            zone: zone.into(),
        }
    }

    /// Creates an empty registry that follows the machine's time zone,
    /// including daylight saving changes.
    pub fn with_local_zone() -> Self {
        Self::new(Zone::Local)
    }

    pub fn time_zone(&self) -> Zone {
        self.zone
    }

    /// The current snapshot. Cheap; clones an `Arc`.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.borrow().clone()
    }

    /// Replaces the whole state in one step and returns the new snapshot.
    pub fn refresh(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.send_replace(snapshot.clone());
        info!(
            "Registry refreshed: {} list(s), {} meal(s), {} recipe(s)",
            snapshot.lists().len(),
            snapshot.planned_meals().len(),
            snapshot.recipes().len()
        );
        snapshot
    }

    /// Receiver that observes every future swap.
    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.current.subscribe()
    }

    pub fn lists(&self) -> Vec<ShoppingList> {
        self.snapshot().lists().to_vec()
    }

    pub fn list_by_id(&self, identifier: &str) -> Option<ShoppingList> {
        self.snapshot().list_by_id(identifier).cloned()
    }

    pub fn list_by_name(&self, name: &str) -> Option<ShoppingList> {
        self.snapshot().list_by_name(name).cloned()
    }

    pub fn list_for(&self, item: &Item) -> Option<ShoppingList> {
        self.snapshot().list_for(item).cloned()
    }

    pub fn recipe_by_id(&self, identifier: &str) -> Option<Recipe> {
        self.snapshot().recipe_by_id(identifier).cloned()
    }

    pub fn recipe_by_name(&self, name: &str) -> Option<Recipe> {
        self.snapshot().recipe_by_name(name).cloned()
    }

    pub fn recipe_for(&self, meal: &Meal) -> Option<Recipe> {
        self.snapshot().recipe_for(meal).cloned()
    }

    pub fn label_by_id(&self, identifier: &str) -> Option<MealPlanLabel> {
        self.snapshot().label_by_id(identifier).cloned()
    }

    pub fn label_for(&self, meal: &Meal) -> Option<MealPlanLabel> {
        self.snapshot().label_for(meal).cloned()
    }

    pub fn planned_meals(&self) -> Vec<Meal> {
        self.snapshot().planned_meals().to_vec()
    }

    /// All planned meals on the calendar day `date` falls on.
    pub fn meals_for_date(&self, date: impl Into<DateQuery>) -> Result<Vec<Meal>, ModelError> {
        let day = self.zone.day_of(&date.into())?;
        Ok(self.meals_on(day))
    }

    /// Planned meals for today in the registry's time zone.
    pub fn meals_for_today(&self) -> Vec<Meal> {
        self.meals_on(self.zone.today())
    }

    fn meals_on(&self, day: NaiveDate) -> Vec<Meal> {
        self.snapshot()
            .planned_meals()
            .iter()
            .filter(|m| m.is_on(day))
            .cloned()
            .collect()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::with_local_zone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeIngredient;
    use crate::sync::protocol::{CalendarEventRecord, ListRecord, RecipeRecord};
    use chrono::{LocalResult, NaiveDateTime};
    use std::thread;

    /// US Eastern for 2025: EDT from 2025-03-09 07:00 UTC until
    /// 2025-11-02 06:00 UTC, EST otherwise.
    #[derive(Debug, Clone, Copy)]
    struct Eastern2025;

    impl Eastern2025 {
        fn offset_at(utc: &NaiveDateTime) -> FixedOffset {
            let start = Utc.with_ymd_and_hms(2025, 3, 9, 7, 0, 0).unwrap().naive_utc();
            let end = Utc.with_ymd_and_hms(2025, 11, 2, 6, 0, 0).unwrap().naive_utc();
            let hours = if *utc >= start && *utc < end { 4 } else { 5 };
            FixedOffset::west_opt(hours * 3600).unwrap()
        }
    }

    impl TimeZone for Eastern2025 {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            Eastern2025
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(12, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            LocalResult::Single(Self::offset_at(&(*local + chrono::Duration::hours(5))))
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            Self::offset_at(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            Self::offset_at(utc)
        }
    }

    fn millis(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn meal(id: &str, date: &str) -> Meal {
        Meal::from_record(CalendarEventRecord {
            identifier: Some(id.to_string()),
            date: date.to_string(),
            title: id.to_string(),
            ..CalendarEventRecord::default()
        })
    }

    fn generation(n: usize) -> Snapshot {
        let name = format!("gen-{}", n);
        Snapshot::new(
            vec![ShoppingList::from_record(ListRecord {
                identifier: Some("list".to_string()),
                name: name.clone(),
                items: Vec::new(),
            })],
            vec![meal(&name, "2025-01-01")],
            vec![Recipe::from_record(RecipeRecord {
                identifier: Some("recipe".to_string()),
                name,
                ingredients: vec![RecipeIngredient::default()],
                ..RecipeRecord::default()
            })],
            Vec::new(),
        )
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn registry_with_meals() -> EntityRegistry {
        let registry = EntityRegistry::new(utc());
        registry.refresh(Snapshot::new(
            Vec::new(),
            vec![
                meal("a", "2025-03-14"),
                meal("b", "2025-03-15"),
                meal("c", "2025-03-14"),
                meal("d", "not a date"),
            ],
            Vec::new(),
            Vec::new(),
        ));
        registry
    }

    fn ids(meals: &[Meal]) -> Vec<&str> {
        meals.iter().map(|m| m.identifier.as_str()).collect()
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = EntityRegistry::new(utc());
        assert!(registry.lists().is_empty());
        assert!(registry.planned_meals().is_empty());
        assert!(registry.recipe_by_name("anything").is_none());
    }

    #[test]
    fn test_meals_for_date_string() {
        let registry = registry_with_meals();
        let meals = registry.meals_for_date("2025-03-14").unwrap();
        assert_eq!(ids(&meals), vec!["a", "c"]);
    }

    #[test]
    fn test_meals_for_epoch_millis() {
        let registry = registry_with_meals();
        // 2025-03-15T12:00:00Z
        let meals = registry.meals_for_date(1_742_040_000_000_i64).unwrap();
        assert_eq!(ids(&meals), vec!["b"]);
    }

    #[test]
    fn test_meals_for_date_like_values() {
        let registry = registry_with_meals();

        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(ids(&registry.meals_for_date(day).unwrap()), vec!["a", "c"]);

        let instant = Utc.with_ymd_and_hms(2025, 3, 15, 8, 0, 0).unwrap();
        assert_eq!(ids(&registry.meals_for_date(instant).unwrap()), vec!["b"]);
    }

    #[test]
    fn test_instants_resolve_in_registry_zone() {
        // 01:00 on the 15th in UTC is still the 14th five hours west.
        let zone = FixedOffset::west_opt(5 * 3600).unwrap();
        let registry = EntityRegistry::new(zone);
        registry.refresh(registry_with_meals().snapshot().as_ref().clone());

        let meals = registry
            .meals_for_date("2025-03-15T01:00:00Z")
            .unwrap();
        assert_eq!(ids(&meals), vec!["a", "c"]);
    }

    #[test]
    fn test_instants_use_offset_in_effect_on_that_day() {
        // 04:30 UTC is 23:30 the day before under EST but 00:30 under EDT.
        let winter = DateQuery::Timestamp(millis(2025, 1, 15, 4, 30));
        let summer = DateQuery::Timestamp(millis(2025, 7, 15, 4, 30));

        assert_eq!(
            winter.to_day(&Eastern2025).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 14).unwrap()
        );
        assert_eq!(
            summer.to_day(&Eastern2025).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
        );

        // Neither standing offset gets both days right.
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let edt = FixedOffset::west_opt(4 * 3600).unwrap();
        assert_eq!(
            summer.to_day(&est).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
        );
        assert_eq!(
            winter.to_day(&edt).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );

        let text = DateQuery::from("2025-01-15T04:30:00Z");
        assert_eq!(
            text.to_day(&Eastern2025).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 14).unwrap()
        );
    }

    #[test]
    fn test_local_registry_resolves_each_instant_with_its_own_offset() {
        let winter = millis(2025, 1, 15, 4, 30);
        let summer = millis(2025, 7, 15, 4, 30);
        let local_day = |t: i64| {
            DateTime::from_timestamp_millis(t)
                .unwrap()
                .with_timezone(&Local)
                .date_naive()
        };

        let registry = EntityRegistry::with_local_zone();
        assert_eq!(registry.time_zone(), Zone::Local);
        registry.refresh(Snapshot::new(
            Vec::new(),
            vec![
                meal("winter", &local_day(winter).to_string()),
                meal("summer", &local_day(summer).to_string()),
            ],
            Vec::new(),
            Vec::new(),
        ));

        assert_eq!(ids(&registry.meals_for_date(winter).unwrap()), vec!["winter"]);
        assert_eq!(ids(&registry.meals_for_date(summer).unwrap()), vec!["summer"]);
    }

    #[test]
    fn test_fixed_zone_today() {
        let zone = Zone::from(FixedOffset::east_opt(0).unwrap());
        let before = Utc::now().date_naive();
        let today = zone.today();
        assert!(today >= before && today <= Utc::now().date_naive());
        assert_eq!(zone.to_string(), "+00:00");
        assert_eq!(Zone::Local.to_string(), "local");
    }

    #[test]
    fn test_invalid_date_is_validation_error() {
        let registry = registry_with_meals();
        let err = registry.meals_for_date("next tuesday").unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));

        let err = registry.meals_for_date(i64::MAX).unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));
    }

    #[test]
    fn test_no_meals_on_day() {
        let registry = registry_with_meals();
        assert!(registry.meals_for_date("2030-01-01").unwrap().is_empty());
    }

    #[test]
    fn test_refresh_replaces_everything() {
        let registry = EntityRegistry::new(utc());
        registry.refresh(generation(1));
        let old = registry.snapshot();

        registry.refresh(generation(2));

        assert_eq!(old.lists()[0].name, "gen-1");
        assert_eq!(registry.lists()[0].name, "gen-2");
        assert_eq!(registry.recipe_by_id("recipe").unwrap().name, "gen-2");
    }

    #[test]
    fn test_refresh_is_atomic_for_concurrent_readers() {
        let registry = Arc::new(EntityRegistry::new(utc()));
        registry.refresh(generation(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snapshot = registry.snapshot();
                        let list_gen = &snapshot.lists()[0].name;
                        let recipe_gen = &snapshot.recipes()[0].name;
                        let meal_gen = &snapshot.planned_meals()[0].identifier;
                        assert_eq!(list_gen, recipe_gen);
                        assert_eq!(list_gen, meal_gen);
                    }
                })
            })
            .collect();

        for n in 1..500 {
            registry.refresh(generation(n));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn test_watch_sees_swaps() {
        let registry = EntityRegistry::new(utc());
        let mut rx = registry.watch();
        registry.refresh(generation(3));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().lists()[0].name, "gen-3");
    }
}
