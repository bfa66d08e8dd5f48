//! Inventory Reader (§4.6): a read-only façade over Site → Floor → Switch.

mod floor;
mod reader;
mod site;
mod switch;

pub use floor::Floor;
pub use reader::{
    all_sites, all_switches_on_floor, enabled_switches_on_floor, find_floor_by_name,
    find_site_by_name, floors_for_site, get_switch,
};
pub use site::Site;
pub use switch::{Switch, SwitchModel};
