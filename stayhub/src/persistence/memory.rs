//! In-process storage backend.
//!
//! Every table lives behind one mutex, so a booking write re-checks the
//! conflict rules and inserts under the same guard. Used for local runs
//! (`STORAGE_BACKEND=memory`) and tests.

use super::{
    BookingRepository, CatalogRepository, ExperienceRepository, MediaRepository, Page,
    ReviewRepository, RoomRepository, StoreError, StoreHealth, StoreResult, UserRepository,
    WishlistRepository,
};
use crate::bookings::checker;
use crate::types::{
    Amenity, AmenityDraft, AmenityId, Booking, BookingId, Category, CategoryDraft, CategoryId,
    Experience, ExperienceId, Listing, NewBooking, NewExperience, NewRoom, NewUser, Perk,
    PerkDraft, PerkId, Photo, PhotoDraft, PhotoId, Reservation, Review, ReviewDraft, ReviewId,
    Room, RoomId, User, UserId, Video, VideoId, Wishlist, WishlistId,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Rows keyed by primary key, with their own sequence.
#[derive(Debug)]
struct Table<V> {
    next: i64,
    rows: BTreeMap<i64, V>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            next: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<V: Clone> Table<V> {
    fn insert(&mut self, build: impl FnOnce(i64) -> V) -> V {
        let pk = self.next;
        self.next += 1;
        let row = build(pk);
        self.rows.insert(pk, row.clone());
        row
    }

    fn get(&self, pk: i64, resource: &'static str) -> StoreResult<&V> {
        self.rows
            .get(&pk)
            .ok_or_else(|| StoreError::not_found(resource, pk))
    }

    fn replace(&mut self, pk: i64, resource: &'static str, row: V) -> StoreResult<V> {
        let slot = self
            .rows
            .get_mut(&pk)
            .ok_or_else(|| StoreError::not_found(resource, pk))?;
        slot.clone_from(&row);
        Ok(row)
    }

    fn remove(&mut self, pk: i64, resource: &'static str) -> StoreResult<V> {
        self.rows
            .remove(&pk)
            .ok_or_else(|| StoreError::not_found(resource, pk))
    }

    fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.rows.values()
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<User>,
    categories: Table<Category>,
    amenities: Table<Amenity>,
    perks: Table<Perk>,
    rooms: Table<Room>,
    experiences: Table<Experience>,
    photos: Table<Photo>,
    videos: Table<Video>,
    reviews: Table<Review>,
    wishlists: Table<Wishlist>,
    bookings: Table<Booking>,
}

impl Tables {
    fn ensure_category(&self, pk: Option<CategoryId>) -> StoreResult<()> {
        match pk {
            Some(pk) if !self.categories.rows.contains_key(&pk.get()) => {
                Err(StoreError::InvalidReference {
                    resource: "Category",
                    id: pk.get(),
                })
            },
            _ => Ok(()),
        }
    }

    fn ensure_amenities(&self, amenities: &[AmenityId]) -> StoreResult<()> {
        match amenities
            .iter()
            .find(|pk| !self.amenities.rows.contains_key(&pk.get()))
        {
            Some(missing) => Err(StoreError::InvalidReference {
                resource: "Amenity",
                id: missing.get(),
            }),
            None => Ok(()),
        }
    }

    fn ensure_perks(&self, perks: &[PerkId]) -> StoreResult<()> {
        match perks
            .iter()
            .find(|pk| !self.perks.rows.contains_key(&pk.get()))
        {
            Some(missing) => Err(StoreError::InvalidReference {
                resource: "Perk",
                id: missing.get(),
            }),
            None => Ok(()),
        }
    }

    fn ensure_listing(&self, listing: Listing) -> StoreResult<()> {
        match listing {
            Listing::Room(pk) => self.rooms.get(pk.get(), "Room").map(|_| ()),
            Listing::Experience(pk) => self.experiences.get(pk.get(), "Experience").map(|_| ()),
        }
    }

    fn bookings_for(&self, listing: Listing) -> Vec<Booking> {
        self.bookings
            .values()
            .filter(|booking| booking.reservation.listing() == listing)
            .cloned()
            .collect()
    }

    /// Overlap or capacity check of `reservation` against the stored bookings.
    fn check_reservation(
        &self,
        reservation: &Reservation,
        excluding: Option<BookingId>,
    ) -> StoreResult<()> {
        let existing = self.bookings_for(reservation.listing());
        match *reservation {
            Reservation::Room {
                room,
                check_in,
                check_out,
            } => {
                self.rooms.get(room.get(), "Room")?;
                if checker::has_room_conflict(&existing, room, check_in, check_out, excluding) {
                    return Err(StoreError::DateOverlap);
                }
            },
            Reservation::Experience {
                experience,
                experience_time,
            } => {
                let max_team = self
                    .experiences
                    .get(experience.get(), "Experience")?
                    .experience_max_team;
                if checker::has_experience_capacity_conflict(
                    &existing,
                    experience,
                    max_team,
                    experience_time,
                    excluding,
                ) {
                    return Err(StoreError::CapacityExceeded { max_team });
                }
            },
        }
        Ok(())
    }

    fn drop_listing(&mut self, listing: Listing) {
        self.bookings
            .rows
            .retain(|_, booking| booking.reservation.listing() != listing);
        self.photos.rows.retain(|_, photo| photo.listing != listing);
        self.reviews.rows.retain(|_, review| review.listing != listing);
        for wishlist in self.wishlists.rows.values_mut() {
            match listing {
                Listing::Room(pk) => wishlist.rooms.retain(|room| *room != pk),
                Listing::Experience(pk) => wishlist.experiences.retain(|e| *e != pk),
            }
        }
        if let Listing::Experience(pk) = listing {
            self.videos.rows.retain(|_, video| video.experience != pk);
        }
    }
}

/// Storage backend holding every table in process memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate { field: "username" });
        }
        Ok(tables.users.insert(|pk| User {
            pk: UserId::new(pk),
            username: user.username,
            name: user.name,
            email: user.email,
            is_host: user.is_host,
            password_hash: user.password_hash,
        }))
    }

    async fn user(&self, pk: UserId) -> StoreResult<User> {
        self.tables()?.users.get(pk.get(), "User").cloned()
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<User> {
        self.tables()?
            .users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", username))
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.tables()?;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username && u.pk != user.pk)
        {
            return Err(StoreError::Duplicate { field: "username" });
        }
        tables.users.replace(user.pk.get(), "User", user)
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.tables()?.categories.values().cloned().collect())
    }

    async fn category(&self, pk: CategoryId) -> StoreResult<Category> {
        self.tables()?.categories.get(pk.get(), "Category").cloned()
    }

    async fn create_category(&self, draft: CategoryDraft) -> StoreResult<Category> {
        Ok(self.tables()?.categories.insert(|pk| Category {
            pk: CategoryId::new(pk),
            name: draft.name,
            kind: draft.kind,
        }))
    }

    async fn update_category(&self, category: Category) -> StoreResult<Category> {
        self.tables()?
            .categories
            .replace(category.pk.get(), "Category", category)
    }

    async fn delete_category(&self, pk: CategoryId) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.categories.remove(pk.get(), "Category")?;
        for room in tables.rooms.rows.values_mut() {
            if room.category == Some(pk) {
                room.category = None;
            }
        }
        for experience in tables.experiences.rows.values_mut() {
            if experience.category == Some(pk) {
                experience.category = None;
            }
        }
        Ok(())
    }

    async fn amenities(&self) -> StoreResult<Vec<Amenity>> {
        Ok(self.tables()?.amenities.values().cloned().collect())
    }

    async fn amenity(&self, pk: AmenityId) -> StoreResult<Amenity> {
        self.tables()?.amenities.get(pk.get(), "Amenity").cloned()
    }

    async fn create_amenity(&self, draft: AmenityDraft) -> StoreResult<Amenity> {
        Ok(self.tables()?.amenities.insert(|pk| Amenity {
            pk: AmenityId::new(pk),
            name: draft.name,
            description: draft.description,
        }))
    }

    async fn update_amenity(&self, amenity: Amenity) -> StoreResult<Amenity> {
        self.tables()?
            .amenities
            .replace(amenity.pk.get(), "Amenity", amenity)
    }

    async fn delete_amenity(&self, pk: AmenityId) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.amenities.remove(pk.get(), "Amenity")?;
        for room in tables.rooms.rows.values_mut() {
            room.amenities.retain(|amenity| *amenity != pk);
        }
        Ok(())
    }

    async fn perks(&self) -> StoreResult<Vec<Perk>> {
        Ok(self.tables()?.perks.values().cloned().collect())
    }

    async fn perk(&self, pk: PerkId) -> StoreResult<Perk> {
        self.tables()?.perks.get(pk.get(), "Perk").cloned()
    }

    async fn create_perk(&self, draft: PerkDraft) -> StoreResult<Perk> {
        Ok(self.tables()?.perks.insert(|pk| Perk {
            pk: PerkId::new(pk),
            name: draft.name,
            details: draft.details,
            explanation: draft.explanation,
        }))
    }

    async fn update_perk(&self, perk: Perk) -> StoreResult<Perk> {
        self.tables()?.perks.replace(perk.pk.get(), "Perk", perk)
    }

    async fn delete_perk(&self, pk: PerkId) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.perks.remove(pk.get(), "Perk")?;
        for experience in tables.experiences.rows.values_mut() {
            experience.perks.retain(|perk| *perk != pk);
        }
        Ok(())
    }
}

#[async_trait]
impl RoomRepository for MemoryStore {
    async fn rooms(&self) -> StoreResult<Vec<Room>> {
        Ok(self.tables()?.rooms.values().cloned().collect())
    }

    async fn room(&self, pk: RoomId) -> StoreResult<Room> {
        self.tables()?.rooms.get(pk.get(), "Room").cloned()
    }

    async fn create_room(&self, room: NewRoom) -> StoreResult<Room> {
        let mut tables = self.tables()?;
        tables.users.get(room.owner.get(), "User")?;
        tables.ensure_category(Some(room.category))?;
        tables.ensure_amenities(&room.amenities)?;

        let NewRoom {
            draft,
            owner,
            category,
            amenities,
        } = room;
        Ok(tables.rooms.insert(|pk| Room {
            pk: RoomId::new(pk),
            name: draft.name,
            country: draft.country,
            city: draft.city,
            price: draft.price,
            rooms: draft.rooms,
            toilets: draft.toilets,
            description: draft.description,
            address: draft.address,
            pet_friendly: draft.pet_friendly,
            kind: draft.kind,
            owner,
            category: Some(category),
            amenities,
        }))
    }

    async fn update_room(&self, room: Room) -> StoreResult<Room> {
        let mut tables = self.tables()?;
        tables.ensure_category(room.category)?;
        tables.ensure_amenities(&room.amenities)?;
        tables.rooms.replace(room.pk.get(), "Room", room)
    }

    async fn delete_room(&self, pk: RoomId) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.rooms.remove(pk.get(), "Room")?;
        tables.drop_listing(Listing::Room(pk));
        Ok(())
    }

    async fn room_amenities(&self, pk: RoomId, page: Page) -> StoreResult<Vec<Amenity>> {
        let tables = self.tables()?;
        let room = tables.rooms.get(pk.get(), "Room")?;
        let amenities: Vec<Amenity> = room
            .amenities
            .iter()
            .filter_map(|amenity| tables.amenities.rows.get(&amenity.get()).cloned())
            .collect();
        Ok(page.apply(amenities))
    }
}

#[async_trait]
impl ExperienceRepository for MemoryStore {
    async fn experiences(&self) -> StoreResult<Vec<Experience>> {
        Ok(self.tables()?.experiences.values().cloned().collect())
    }

    async fn experience(&self, pk: ExperienceId) -> StoreResult<Experience> {
        self.tables()?
            .experiences
            .get(pk.get(), "Experience")
            .cloned()
    }

    async fn create_experience(&self, experience: NewExperience) -> StoreResult<Experience> {
        let mut tables = self.tables()?;
        tables.users.get(experience.host.get(), "User")?;
        tables.ensure_category(Some(experience.category))?;
        tables.ensure_perks(&experience.perks)?;

        let NewExperience {
            draft,
            host,
            category,
            perks,
        } = experience;
        Ok(tables.experiences.insert(|pk| Experience {
            pk: ExperienceId::new(pk),
            name: draft.name,
            country: draft.country,
            city: draft.city,
            host,
            price: draft.price,
            address: draft.address,
            start: draft.start,
            end: draft.end,
            description: draft.description,
            category: Some(category),
            perks,
            experience_max_team: draft.experience_max_team,
        }))
    }

    async fn update_experience(&self, experience: Experience) -> StoreResult<Experience> {
        let mut tables = self.tables()?;
        tables.ensure_category(experience.category)?;
        tables.ensure_perks(&experience.perks)?;
        tables
            .experiences
            .replace(experience.pk.get(), "Experience", experience)
    }

    async fn delete_experience(&self, pk: ExperienceId) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.experiences.remove(pk.get(), "Experience")?;
        tables.drop_listing(Listing::Experience(pk));
        Ok(())
    }

    async fn experience_perks(&self, pk: ExperienceId) -> StoreResult<Vec<Perk>> {
        let tables = self.tables()?;
        let experience = tables.experiences.get(pk.get(), "Experience")?;
        Ok(experience
            .perks
            .iter()
            .filter_map(|perk| tables.perks.rows.get(&perk.get()).cloned())
            .collect())
    }
}

#[async_trait]
impl MediaRepository for MemoryStore {
    async fn add_photo(&self, listing: Listing, draft: PhotoDraft) -> StoreResult<Photo> {
        let mut tables = self.tables()?;
        tables.ensure_listing(listing)?;
        Ok(tables.photos.insert(|pk| Photo {
            pk: PhotoId::new(pk),
            file: draft.file,
            description: draft.description,
            listing,
        }))
    }

    async fn photos(&self, listing: Listing) -> StoreResult<Vec<Photo>> {
        Ok(self
            .tables()?
            .photos
            .values()
            .filter(|photo| photo.listing == listing)
            .cloned()
            .collect())
    }

    async fn photo(&self, pk: PhotoId) -> StoreResult<Photo> {
        self.tables()?.photos.get(pk.get(), "Photo").cloned()
    }

    async fn delete_photo(&self, pk: PhotoId) -> StoreResult<()> {
        self.tables()?.photos.remove(pk.get(), "Photo").map(|_| ())
    }

    async fn put_video(&self, experience: ExperienceId, file: String) -> StoreResult<Video> {
        let mut tables = self.tables()?;
        tables.experiences.get(experience.get(), "Experience")?;
        tables
            .videos
            .rows
            .retain(|_, video| video.experience != experience);
        Ok(tables.videos.insert(|pk| Video {
            pk: VideoId::new(pk),
            file,
            experience,
        }))
    }

    async fn video(&self, pk: VideoId) -> StoreResult<Video> {
        self.tables()?.videos.get(pk.get(), "Video").cloned()
    }

    async fn experience_video(&self, experience: ExperienceId) -> StoreResult<Option<Video>> {
        Ok(self
            .tables()?
            .videos
            .values()
            .find(|video| video.experience == experience)
            .cloned())
    }

    async fn delete_video(&self, pk: VideoId) -> StoreResult<()> {
        self.tables()?.videos.remove(pk.get(), "Video").map(|_| ())
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn add_review(
        &self,
        listing: Listing,
        user: UserId,
        draft: ReviewDraft,
    ) -> StoreResult<Review> {
        let mut tables = self.tables()?;
        tables.ensure_listing(listing)?;
        Ok(tables.reviews.insert(|pk| Review {
            pk: ReviewId::new(pk),
            user,
            payload: draft.payload,
            rating: draft.rating,
            listing,
        }))
    }

    async fn reviews(&self, listing: Listing, page: Page) -> StoreResult<Vec<Review>> {
        let reviews: Vec<Review> = self
            .tables()?
            .reviews
            .values()
            .rev()
            .filter(|review| review.listing == listing)
            .cloned()
            .collect();
        Ok(page.apply(reviews))
    }

    async fn average_rating(&self, listing: Listing) -> StoreResult<Option<f64>> {
        let tables = self.tables()?;
        let ratings: Vec<f64> = tables
            .reviews
            .values()
            .filter(|review| review.listing == listing)
            .map(|review| f64::from(review.rating))
            .collect();
        if ratings.is_empty() {
            return Ok(None);
        }
        #[allow(clippy::cast_precision_loss)]
        let count = ratings.len() as f64;
        Ok(Some(ratings.iter().sum::<f64>() / count))
    }
}

#[async_trait]
impl WishlistRepository for MemoryStore {
    async fn wishlists(&self, user: UserId) -> StoreResult<Vec<Wishlist>> {
        Ok(self
            .tables()?
            .wishlists
            .values()
            .filter(|wishlist| wishlist.user == user)
            .cloned()
            .collect())
    }

    async fn wishlist(&self, pk: WishlistId) -> StoreResult<Wishlist> {
        self.tables()?.wishlists.get(pk.get(), "Wishlist").cloned()
    }

    async fn create_wishlist(&self, user: UserId, name: String) -> StoreResult<Wishlist> {
        Ok(self.tables()?.wishlists.insert(|pk| Wishlist {
            pk: WishlistId::new(pk),
            name,
            user,
            rooms: Vec::new(),
            experiences: Vec::new(),
        }))
    }

    async fn rename_wishlist(&self, pk: WishlistId, name: String) -> StoreResult<Wishlist> {
        let mut tables = self.tables()?;
        let mut wishlist = tables.wishlists.get(pk.get(), "Wishlist")?.clone();
        wishlist.name = name;
        tables.wishlists.replace(pk.get(), "Wishlist", wishlist)
    }

    async fn delete_wishlist(&self, pk: WishlistId) -> StoreResult<()> {
        self.tables()?
            .wishlists
            .remove(pk.get(), "Wishlist")
            .map(|_| ())
    }

    async fn toggle_room(&self, pk: WishlistId, room: RoomId) -> StoreResult<Wishlist> {
        let mut tables = self.tables()?;
        tables.rooms.get(room.get(), "Room")?;
        let mut wishlist = tables.wishlists.get(pk.get(), "Wishlist")?.clone();
        if wishlist.rooms.contains(&room) {
            wishlist.rooms.retain(|saved| *saved != room);
        } else {
            wishlist.rooms.push(room);
        }
        tables.wishlists.replace(pk.get(), "Wishlist", wishlist)
    }

    async fn toggle_experience(
        &self,
        pk: WishlistId,
        experience: ExperienceId,
    ) -> StoreResult<Wishlist> {
        let mut tables = self.tables()?;
        tables.experiences.get(experience.get(), "Experience")?;
        let mut wishlist = tables.wishlists.get(pk.get(), "Wishlist")?.clone();
        if wishlist.experiences.contains(&experience) {
            wishlist.experiences.retain(|saved| *saved != experience);
        } else {
            wishlist.experiences.push(experience);
        }
        tables.wishlists.replace(pk.get(), "Wishlist", wishlist)
    }

    async fn is_liked(&self, user: UserId, listing: Listing) -> StoreResult<bool> {
        Ok(self
            .tables()?
            .wishlists
            .values()
            .filter(|wishlist| wishlist.user == user)
            .any(|wishlist| match listing {
                Listing::Room(pk) => wishlist.rooms.contains(&pk),
                Listing::Experience(pk) => wishlist.experiences.contains(&pk),
            }))
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn bookings_for(&self, listing: Listing) -> StoreResult<Vec<Booking>> {
        Ok(self.tables()?.bookings_for(listing))
    }

    async fn booking(&self, pk: BookingId) -> StoreResult<Booking> {
        self.tables()?.bookings.get(pk.get(), "Booking").cloned()
    }

    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut tables = self.tables()?;
        tables.check_reservation(&booking.reservation, None)?;
        Ok(tables.bookings.insert(|pk| Booking {
            pk: BookingId::new(pk),
            user: booking.user,
            guests: booking.guests,
            reservation: booking.reservation,
        }))
    }

    async fn update_booking(&self, booking: Booking) -> StoreResult<Booking> {
        let mut tables = self.tables()?;
        tables.bookings.get(booking.pk.get(), "Booking")?;
        tables.check_reservation(&booking.reservation, Some(booking.pk))?;
        tables.bookings.replace(booking.pk.get(), "Booking", booking)
    }

    async fn delete_booking(&self, pk: BookingId) -> StoreResult<()> {
        self.tables()?
            .bookings
            .remove(pk.get(), "Booking")
            .map(|_| ())
    }

    async fn delete_upcoming_room_bookings(
        &self,
        room: RoomId,
        today: NaiveDate,
    ) -> StoreResult<u64> {
        let mut tables = self.tables()?;
        let before = tables.bookings.rows.len();
        tables.bookings.rows.retain(|_, booking| {
            !matches!(
                booking.reservation,
                Reservation::Room { room: booked, check_out, .. }
                    if booked == room && check_out >= today
            )
        });
        let deleted = before - tables.bookings.rows.len();
        Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.tables().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{CategoryKind, RoomDraft, RoomKind};
    use chrono::{TimeZone, Utc};

    async fn seeded() -> (MemoryStore, UserId, CategoryId) {
        let store = MemoryStore::new();
        let owner = store
            .create_user(NewUser {
                username: "host".into(),
                name: "Host".into(),
                email: "host@example.com".into(),
                is_host: true,
                password_hash: String::new(),
            })
            .await
            .unwrap()
            .pk;
        let category = store
            .create_category(CategoryDraft {
                name: "Cabins".into(),
                kind: CategoryKind::Rooms,
            })
            .await
            .unwrap()
            .pk;
        (store, owner, category)
    }

    fn new_room(owner: UserId, category: CategoryId, amenities: Vec<AmenityId>) -> NewRoom {
        NewRoom {
            draft: RoomDraft {
                name: "Cabin".into(),
                country: "Korea".into(),
                city: "Seoul".into(),
                price: 80,
                rooms: 1,
                toilets: 1,
                description: String::new(),
                address: "Somewhere".into(),
                pet_friendly: false,
                kind: RoomKind::PrivateRoom,
            },
            owner,
            category,
            amenities,
        }
    }

    fn stay(room: RoomId, from: u32, to: u32) -> NewBooking {
        NewBooking {
            user: UserId::new(1),
            guests: 1,
            reservation: Reservation::Room {
                room,
                check_in: NaiveDate::from_ymd_opt(2024, 6, from).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2024, 6, to).unwrap(),
            },
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let (store, _, _) = seeded().await;
        let result = store
            .create_user(NewUser {
                username: "host".into(),
                name: "Other".into(),
                email: "other@example.com".into(),
                is_host: false,
                password_hash: String::new(),
            })
            .await;
        assert_eq!(result, Err(StoreError::Duplicate { field: "username" }));
    }

    #[tokio::test]
    async fn test_room_with_unknown_amenity_is_not_created() {
        let (store, owner, category) = seeded().await;
        let wifi = store
            .create_amenity(AmenityDraft {
                name: "Wifi".into(),
                description: None,
            })
            .await
            .unwrap()
            .pk;

        let result = store
            .create_room(new_room(owner, category, vec![wifi, AmenityId::new(42)]))
            .await;

        assert_eq!(
            result,
            Err(StoreError::InvalidReference {
                resource: "Amenity",
                id: 42
            })
        );
        assert!(store.rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_booking_writes_recheck_overlap() {
        let (store, owner, category) = seeded().await;
        let room = store
            .create_room(new_room(owner, category, vec![]))
            .await
            .unwrap()
            .pk;

        let first = store.create_booking(stay(room, 1, 5)).await.unwrap();
        let second = store.create_booking(stay(room, 7, 9)).await.unwrap();
        assert_eq!(
            store.create_booking(stay(room, 5, 6)).await,
            Err(StoreError::DateOverlap)
        );

        // Moving the second stay onto the first is refused, shifting it is not.
        let mut moved = second.clone();
        moved.reservation = stay(room, 4, 9).reservation;
        assert_eq!(store.update_booking(moved).await, Err(StoreError::DateOverlap));
        let mut shifted = second;
        shifted.reservation = stay(room, 6, 10).reservation;
        assert!(store.update_booking(shifted).await.is_ok());

        let mut longer = first;
        longer.reservation = stay(room, 1, 5).reservation;
        longer.guests = 3;
        assert!(store.update_booking(longer).await.is_ok());
    }

    #[tokio::test]
    async fn test_deleting_a_room_cascades() {
        let (store, owner, category) = seeded().await;
        let room = store
            .create_room(new_room(owner, category, vec![]))
            .await
            .unwrap()
            .pk;
        let booking = store.create_booking(stay(room, 1, 2)).await.unwrap();
        let wishlist = store.create_wishlist(owner, "Trips".into()).await.unwrap();
        store.toggle_room(wishlist.pk, room).await.unwrap();
        store
            .add_review(
                Listing::Room(room),
                owner,
                ReviewDraft {
                    payload: "Cozy".into(),
                    rating: 5,
                },
            )
            .await
            .unwrap();

        store.delete_room(room).await.unwrap();

        assert!(matches!(
            store.booking(booking.pk).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(store.wishlist(wishlist.pk).await.unwrap().rooms.is_empty());
        assert_eq!(store.average_rating(Listing::Room(room)).await, Ok(None));
    }

    #[tokio::test]
    async fn test_clear_upcoming_keeps_past_stays() {
        let (store, owner, category) = seeded().await;
        let room = store
            .create_room(new_room(owner, category, vec![]))
            .await
            .unwrap()
            .pk;
        store.create_booking(stay(room, 1, 3)).await.unwrap();
        store.create_booking(stay(room, 10, 12)).await.unwrap();
        store.create_booking(stay(room, 20, 22)).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();
        assert_eq!(store.delete_upcoming_room_bookings(room, today).await, Ok(2));
        assert_eq!(store.bookings_for(Listing::Room(room)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_and_is_liked() {
        let (store, owner, category) = seeded().await;
        let room = store
            .create_room(new_room(owner, category, vec![]))
            .await
            .unwrap()
            .pk;
        let wishlist = store.create_wishlist(owner, "Summer".into()).await.unwrap();

        store.toggle_room(wishlist.pk, room).await.unwrap();
        assert!(store.is_liked(owner, Listing::Room(room)).await.unwrap());
        store.toggle_room(wishlist.pk, room).await.unwrap();
        assert!(!store.is_liked(owner, Listing::Room(room)).await.unwrap());
    }

    #[tokio::test]
    async fn test_reviews_newest_first_and_average() {
        let (store, owner, category) = seeded().await;
        let room = store
            .create_room(new_room(owner, category, vec![]))
            .await
            .unwrap()
            .pk;
        for (payload, rating) in [("ok", 3), ("great", 5), ("fine", 4)] {
            store
                .add_review(
                    Listing::Room(room),
                    owner,
                    ReviewDraft {
                        payload: payload.into(),
                        rating,
                    },
                )
                .await
                .unwrap();
        }

        let first_page = store
            .reviews(Listing::Room(room), Page::new(1, 2))
            .await
            .unwrap();
        let payloads: Vec<_> = first_page.iter().map(|r| r.payload.as_str()).collect();
        assert_eq!(payloads, ["fine", "great"]);
        assert_eq!(store.average_rating(Listing::Room(room)).await, Ok(Some(4.0)));
    }

    #[tokio::test]
    async fn test_experience_capacity_is_rechecked() {
        let (store, owner, _) = seeded().await;
        let tours = store
            .create_category(CategoryDraft {
                name: "Tours".into(),
                kind: CategoryKind::Experiences,
            })
            .await
            .unwrap()
            .pk;
        let experience = store
            .create_experience(NewExperience {
                draft: crate::types::ExperienceDraft {
                    name: "Tour".into(),
                    country: "Korea".into(),
                    city: "Busan".into(),
                    price: 20,
                    address: "Pier".into(),
                    start: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end: chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                    description: String::new(),
                    experience_max_team: 1,
                },
                host: owner,
                category: tours,
                perks: vec![],
            })
            .await
            .unwrap()
            .pk;

        let slot = NewBooking {
            user: owner,
            guests: 2,
            reservation: Reservation::Experience {
                experience,
                experience_time: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
            },
        };
        store.create_booking(slot.clone()).await.unwrap();
        assert_eq!(
            store.create_booking(slot).await,
            Err(StoreError::CapacityExceeded { max_team: 1 })
        );
    }
}
