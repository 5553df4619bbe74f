use axum::{routing::get, Router};
use registry::AppRegistry;

use crate::handler::facility::{show_facility, show_facility_list};

pub fn build_facility_routers() -> Router<AppRegistry> {
    let facilities_routers = Router::new()
        .route("/", get(show_facility_list))
        .route("/:facility_id", get(show_facility));

    Router::new().nest("/facilities", facilities_routers)
}
