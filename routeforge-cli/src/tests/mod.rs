//! Shared test harness modules for the routeforge CLI.

use super::*;
