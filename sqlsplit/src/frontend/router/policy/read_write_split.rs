//! Read/write split over one primary and N replicas.

use tracing::{trace, warn};

use super::{
    least_loaded_slave, master_index, max_lag, named_server, sticky_node, Error, Policy,
    RouteTarget, Selection,
};

#[derive(Debug, Default)]
pub struct ReadWriteSplit;

impl Policy for ReadWriteSplit {
    fn name(&self) -> &'static str {
        "read_write_split"
    }

    fn select(&self, selection: &Selection) -> Result<usize, Error> {
        // A hint names the target backend or bounds its lag; if it
        // can't be satisfied, the base target decides.
        if selection.target.is(RouteTarget::NAMED_SERVER) {
            if let Some(index) = named_server(selection) {
                trace!(backend = selection.backends[index].name(), "named server");
                return Ok(index);
            }
        }

        if selection.target.is(RouteTarget::SLAVE) {
            let bound = max_lag(selection);
            if let Some(index) = least_loaded_slave(selection, bound) {
                return Ok(index);
            }

            // No replica qualifies; the primary can always serve
            // the read.
            warn!("no eligible slave, falling back to master");
            return master_index(selection.backends).ok_or(Error::NoEligibleBackend);
        }

        // MASTER or UNDEFINED: sticky node of the open transaction
        // wins over the primary lookup.
        if let Some(index) = sticky_node(selection) {
            return Ok(index);
        }

        master_index(selection.backends).ok_or(Error::NoMaster)
    }
}
