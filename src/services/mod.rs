pub(crate) mod access;
pub(crate) mod email;
pub(crate) mod enrollment;
pub(crate) mod leveling;
pub(crate) mod notifications;
pub(crate) mod progress;
pub(crate) mod promo;
pub(crate) mod rewards;
pub(crate) mod social;
pub(crate) mod storage;
