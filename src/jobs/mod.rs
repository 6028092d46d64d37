pub mod ledger_sweeper;
