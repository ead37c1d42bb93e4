//! Marketplace rows as typed values.

mod booking;
mod ids;
mod property;
mod review;
mod user;

pub use booking::{Booking, BookingQuote, BookingStatus, NewBooking};
pub use ids::{
    AmenityId, BookingId, FavoriteId, LandlordId, PropertyId, ReviewId, StudentId, UniversityId,
    UserId,
};
pub use property::{
    Amenity, NewPropertyAmenity, NewPropertyImage, Property, PropertyDraft, PropertyImage,
    PropertyListing, University,
};
pub use review::{Favorite, NewFavorite, NewReview, Review, ReviewSubmission};
pub use user::{
    Landlord, LandlordProfileInput, NewUser, StudentProfile, StudentProfileInput, User, UserRole,
};
