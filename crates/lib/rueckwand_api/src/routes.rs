//! Route paths.

pub const POST_LOGIN: &str = "/login";
pub const POST_LOGOUT: &str = "/logout";

pub const TOKEN_SESSIONS: &str = "/token-sessions";
pub const TOKEN_SESSIONS_ID: &str = "/token-sessions/{session_id}";

pub const USERS: &str = "/users";
pub const USERS_ID: &str = "/users/{user_id}";

pub const MATERIALS: &str = "/materials";
pub const MATERIALS_ID: &str = "/materials/{material_id}";

pub const PRODUCT_TYPES: &str = "/product-types";
pub const PRODUCT_TYPES_ID: &str = "/product-types/{product_type_id}";

pub const ITEMS: &str = "/items";
pub const ITEMS_ID: &str = "/items/{item_id}";
