/*!
The collaborator interface a catalog implementation must satisfy for
its tables to be commit targets (§6). No catalog is implemented here.
*/

pub mod commit;
