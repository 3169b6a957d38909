// crates/spot_interop/src/test_support.rs

use spot_testhost::MockHost;

use crate::host::Host;

/// Host handle that talks to `mock`. The mock must outlive the handle.
pub fn host_for(mock: &MockHost) -> Host {
    // SAFETY: the mock's action function honours the host contract and its
    // state lives as long as the mock.
    unsafe { Host::new(mock.action_fn(), mock.plugin_handle()) }
}
