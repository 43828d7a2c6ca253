mod management;
mod rendering;
mod students;
