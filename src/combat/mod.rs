pub mod ability;
pub mod conditions;
pub mod damage;
pub mod dispatch;
pub mod formula;
pub mod hooks;
pub mod hostility;
pub mod ledger;
pub mod legality;
pub mod mitigation;
pub mod params;
pub mod report;
pub mod rng;

#[cfg(test)]
pub(crate) mod testkit;
