//! Generated gRPC client/server code, included from `build.rs`'s
//! `tonic-build` output (spec §6.1, §6.2).

pub mod ledger_source {
    tonic::include_proto!("stellar.archiver.ledger");
}

pub mod events {
    tonic::include_proto!("stellar.archiver.events");
}
