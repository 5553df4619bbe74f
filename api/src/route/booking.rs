use axum::{
    routing::{get, patch, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::booking::{
    check_availability, create_booking, record_payment, show_booking, show_booking_list,
    update_booking_status,
};

pub fn build_booking_routers() -> Router<AppRegistry> {
    let bookings_routers = Router::new()
        .route("/", post(create_booking))
        .route("/", get(show_booking_list))
        .route("/:booking_id", get(show_booking))
        .route("/:booking_id/status", patch(update_booking_status))
        .route("/:booking_id/payments", post(record_payment));

    Router::new()
        .nest("/bookings", bookings_routers)
        .route("/availability", get(check_availability))
}
