//! Service descriptors.
//!
//! A descriptor names a kind of RPC service the provider can hand out a
//! client for. Marker types bind a descriptor to the Rust side so client
//! resolution stays typed.

use std::fmt;

/// Opaque identifier of a service kind, carrying its fully-qualified type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceDescriptor {
    type_name: &'static str,
}

impl ServiceDescriptor {
    pub const fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }

    /// Fully-qualified name, e.g. `penumbra.view.v1.ViewService`.
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The trailing service name, e.g. `ViewService`.
    pub fn short_name(&self) -> &'static str {
        self.type_name
            .rsplit_once('.')
            .map_or(self.type_name, |(_, name)| name)
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A service kind the provider can produce a client for.
pub trait Service: Send + Sync + 'static {
    const DESCRIPTOR: ServiceDescriptor;
}

macro_rules! service {
    ($(#[$meta:meta])* $name:ident => $type_name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl Service for $name {
            const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor::new($type_name);
        }
    };
}

service!(
    /// Wallet view: balances, assets, transaction planning and broadcast.
    ViewService => "penumbra.view.v1.ViewService"
);
service!(
    /// Staking queries: validator info and rate data.
    StakeService => "penumbra.core.component.stake.v1.QueryService"
);
service!(
    /// Custody: signing authority held by the wallet.
    CustodyService => "penumbra.custody.v1.CustodyService"
);
service!(
    /// Governance queries.
    GovernanceService => "penumbra.core.component.governance.v1.QueryService"
);
