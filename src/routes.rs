//! Route identifiers and the static role permission table.
//!
//! The table is declarative configuration, not runtime state: each route
//! names the roles allowed to see it, and the guard checks it per
//! navigation. Both roles see every operational screen; reports are
//! owner-only. `Login` and `Unauthorized` are public.

use serde::{Deserialize, Serialize};

use crate::session::Role;

/// Identifier of a navigable view in the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteId {
    Dashboard,
    Menu,
    Categories,
    Tables,
    Orders,
    Reservations,
    Payments,
    Reports,
    Login,
    Unauthorized,
}

/// Roles allowed on each guarded route. Routes absent from this table are
/// public.
const ROUTE_ACCESS: &[(RouteId, &[Role])] = &[
    (RouteId::Dashboard, &[Role::Owner, Role::Cashier]),
    (RouteId::Menu, &[Role::Owner, Role::Cashier]),
    (RouteId::Categories, &[Role::Owner, Role::Cashier]),
    (RouteId::Tables, &[Role::Owner, Role::Cashier]),
    (RouteId::Orders, &[Role::Owner, Role::Cashier]),
    (RouteId::Reservations, &[Role::Owner, Role::Cashier]),
    (RouteId::Payments, &[Role::Owner, Role::Cashier]),
    (RouteId::Reports, &[Role::Owner]),
];

/// Default landing view after login.
pub fn landing() -> RouteId {
    RouteId::Dashboard
}

/// True when the route requires no session at all.
pub fn is_public(route: RouteId) -> bool {
    allowed_roles(route).is_none()
}

/// The roles permitted on a guarded route, or `None` for public routes.
pub fn allowed_roles(route: RouteId) -> Option<&'static [Role]> {
    ROUTE_ACCESS
        .iter()
        .find(|(r, _)| *r == route)
        .map(|(_, roles)| *roles)
}

/// Whether the given role may see the given route.
pub fn is_permitted(role: Role, route: RouteId) -> bool {
    match allowed_roles(route) {
        Some(roles) => roles.contains(&role),
        None => true,
    }
}

/// All guarded routes visible to a role, in navigation order. This is what
/// a sidebar renders instead of filtering scattered conditionals.
pub fn permitted_routes(role: Role) -> Vec<RouteId> {
    ROUTE_ACCESS
        .iter()
        .filter(|(_, roles)| roles.contains(&role))
        .map(|(route, _)| *route)
        .collect()
}
