//! HTTP rendering of domain and storage errors.

use crate::bookings::BookingError;
use crate::persistence::StoreError;
use stayhub_web::AppError;

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        if matches!(error, BookingError::Storage(_)) {
            return Self::internal("Booking storage failed").with_source(error.into());
        }

        let message = error.to_string();
        match &error {
            BookingError::NotFound { resource, id } => Self::not_found(resource, id),
            BookingError::Permission => Self::forbidden(message),
            conflict if conflict.is_conflict() => {
                Self::conflict(message.clone()).with_field(conflict.field(), message)
            },
            invalid => Self::validation(message.clone()).with_field(invalid.field(), message),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { resource, id } => Self::not_found(resource, id),
            StoreError::InvalidReference { .. } => Self::bad_request(error.to_string()),
            StoreError::Duplicate { field } => Self::invalid_field(field, error.to_string()),
            StoreError::DateOverlap | StoreError::CapacityExceeded { .. } => {
                BookingError::from(error).into()
            },
            StoreError::Database(_) => {
                Self::internal("Storage failed").with_source(error.into())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use axum::http::StatusCode;
    use stayhub_web::NON_FIELD_ERRORS;

    #[test]
    fn test_booking_errors_map_to_status_and_field() {
        let past: AppError = BookingError::PastDate { field: "check_in" }.into();
        assert_eq!(past.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(past.code(), "VALIDATION_ERROR");
        assert!(past.fields().unwrap().contains_key("check_in"));

        let overlap: AppError = BookingError::DateOverlap.into();
        assert_eq!(overlap.status(), StatusCode::CONFLICT);
        assert!(overlap.fields().unwrap().contains_key(NON_FIELD_ERRORS));

        let full: AppError = BookingError::CapacityExceeded { max_team: 2 }.into();
        assert_eq!(full.status(), StatusCode::CONFLICT);
        assert!(full.fields().unwrap().contains_key("experience_time"));

        let denied: AppError = BookingError::Permission.into();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let missing: AppError = BookingError::not_found("Booking", 9).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let broken: AppError = BookingError::Storage("pool closed".into()).into();
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_errors_map_to_status() {
        let duplicate: AppError = StoreError::Duplicate { field: "username" }.into();
        assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(duplicate.fields().unwrap().contains_key("username"));

        let reference: AppError = StoreError::InvalidReference {
            resource: "Amenity",
            id: 4,
        }
        .into();
        assert_eq!(reference.status(), StatusCode::BAD_REQUEST);

        let overlap: AppError = StoreError::DateOverlap.into();
        assert_eq!(overlap.status(), StatusCode::CONFLICT);
    }
}
