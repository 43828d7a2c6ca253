mod student_lookup;
