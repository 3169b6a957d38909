// crates/spot_interop/src/variables/scope.rs

use bitflags::bitflags;

bitflags! {
    /// Semantic domains a host variable belongs to. Used only for filtering.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Scope: u32 {
        const IMAGE_METADATA    = 0x01;
        const CAMERA_SETTING    = 0x02;
        const USER_SETTING      = 0x04;
        const CASE_INFORMATION  = 0x08;
        const FILE_PATH         = 0x10;
        const MEASUREMENT       = 0x20;
        const REPORTING         = 0x40;
        const APPLICATION_STATE = 0x80;
    }
}

impl Scope {
    /// No classification.
    pub const UNKNOWN: Scope = Scope::empty();

    /// `exact`: the bitsets are equal. Otherwise: they share at least one bit.
    pub fn matches(self, mask: Scope, exact: bool) -> bool {
        if exact {
            self == mask
        } else {
            self.intersects(mask)
        }
    }
}
