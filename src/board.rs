pub mod kcu1500;
