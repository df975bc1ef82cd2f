pub mod tarball_server;
